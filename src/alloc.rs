//! Allocating wrappers for coordinate transformations.
//!
//! Coordinate transformations try to minimise allocations
//! so that they can be called in tight loops in a variety of situations.
//! But writing the same boilerplate to pre-allocate output buffers is annoying,
//! so this trait handles that for every [Transformation].
use smallvec::smallvec;

use crate::{ShortVec, Transformation, as_muts, as_refs, vec_of_shortvec, vec_of_vec};

pub trait AllocatingTransformation: Transformation {
    /// Transform a given point into a newly-allocated buffer.
    fn transform_point(&self, pt: &[f64]) -> ShortVec<f64> {
        let mut out = smallvec![f64::NAN; self.output_ndim()];
        self.transform_point_into(pt, &mut out);
        out
    }

    fn transform_vector(&self, vec: &[f64]) -> ShortVec<f64> {
        let mut out = smallvec![f64::NAN; self.output_ndim()];
        self.transform_vector_into(vec, &mut out);
        out
    }

    fn transform_covariant_vector(&self, vec: &[f64]) -> ShortVec<f64> {
        let mut out = smallvec![f64::NAN; self.output_ndim()];
        self.transform_covariant_vector_into(vec, &mut out);
        out
    }

    /// Transform a fixed-size point.
    ///
    /// Panics if `D` does not match both the input and output dimensionality.
    fn transform_point_array<const D: usize>(&self, pt: &[f64; D]) -> [f64; D] {
        check_array_len::<D>(self);
        let mut out = [f64::NAN; D];
        self.transform_point_into(pt, &mut out);
        out
    }

    /// Transform a fixed-size free vector.
    ///
    /// Panics if `D` does not match both the input and output dimensionality.
    fn transform_vector_array<const D: usize>(&self, vec: &[f64; D]) -> [f64; D] {
        check_array_len::<D>(self);
        let mut out = [f64::NAN; D];
        self.transform_vector_into(vec, &mut out);
        out
    }

    fn transform_points<C: AsRef<[f64]>>(&self, pts: &[C]) -> Vec<ShortVec<f64>> {
        let mut out = vec_of_shortvec(pts.len(), self.output_ndim(), f64::NAN);
        self.bulk_transform_into(&as_refs(pts), &mut as_muts(&mut out));
        out
    }

    /// Transform points given as one slice per dimension.
    fn transform_columns<C: AsRef<[f64]>>(&self, columns: &[C]) -> Vec<Vec<f64>> {
        let Some(n_pts) = columns.first().map(|c| c.as_ref().len()) else {
            return vec![];
        };
        let mut out = vec_of_vec(self.output_ndim(), n_pts, f64::NAN);
        self.column_transform_into(&as_refs(columns), &mut as_muts(&mut out));
        out
    }
}

impl<T: Transformation + ?Sized> AllocatingTransformation for T {}

fn check_array_len<const D: usize>(t: &(impl Transformation + ?Sized)) {
    assert!(
        t.input_ndim() == D && t.output_ndim() == D,
        "array of length {D} used with a {}-D -> {}-D transformation",
        t.input_ndim(),
        t.output_ndim()
    );
}
