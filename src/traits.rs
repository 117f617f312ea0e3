use crate::{Affine, Matrix, TransformError};

/// Which family a [Transformation] belongs to.
///
/// Lets callers branch on the variant behind a `dyn Transformation`
/// without downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    Identity,
    Translate,
    Scale,
    Affine,
}

/// Core spatial transformation interface.
///
/// Implementations may not perform any bounds checks on the input,
/// as these transformations generally happen in performance-critical hot loops.
/// Therefore, they may panic if coordinates or output buffers of incorrect length are given.
pub trait Transformation: std::fmt::Debug + Send + Sync {
    /// Transform a single point from the input space to the output space.
    /// Writes to a pre-allocated output buffer.
    fn transform_point_into(&self, pt: &[f64], buf: &mut [f64]);

    /// Transform a free vector (a difference between two points).
    /// Translations do not apply.
    fn transform_vector_into(&self, vec: &[f64], buf: &mut [f64]);

    /// Transform a covariant vector, e.g. a surface normal or gradient.
    ///
    /// This uses the same linear-only rule as [Transformation::transform_vector_into];
    /// no inverse-transpose is applied.
    fn transform_covariant_vector_into(&self, vec: &[f64], buf: &mut [f64]) {
        self.transform_vector_into(vec, buf);
    }

    /// Transform multiple points from the input space into the output space.
    /// Writes to pre-allocated output buffers.
    ///
    /// The trait default implementation simply calls [Transformation::transform_point_into] in turn;
    /// specific transforms may override it.
    fn bulk_transform_into(&self, pts: &[&[f64]], bufs: &mut [&mut [f64]]) {
        for (pt, buf) in pts.iter().zip(bufs.iter_mut()) {
            self.transform_point_into(pt, buf);
        }
    }

    /// Transform multiple points given in columnar format.
    /// Writes to pre-allocated output buffers.
    ///
    /// The trait implementation is inefficient,
    /// simply wrapping [Transformation::transform_point_into],
    /// and should be overridden by implementors where optimisations are available.
    fn column_transform_into(&self, columns: &[&[f64]], bufs: &mut [&mut [f64]]) {
        let Some(n_pts) = columns.first().map(|c| c.len()) else {
            return;
        };
        let mut in_pt = vec![f64::NAN; self.input_ndim()];
        let mut out_pt = vec![f64::NAN; self.output_ndim()];
        for pt_idx in 0..n_pts {
            for (idx, col) in columns.iter().enumerate() {
                in_pt[idx] = col[pt_idx];
            }
            self.transform_point_into(&in_pt, &mut out_pt);
            for (out_col, p) in bufs.iter_mut().zip(out_pt.iter()) {
                out_col[pt_idx] = *p;
            }
        }
    }

    /// Return the inverse transformation, if it exists.
    ///
    /// The result is owned by the caller; nothing is shared with `self`.
    fn inverse_transform(&self) -> Option<Box<dyn Transformation>>;

    fn number_of_parameters(&self) -> usize;

    /// The flat parameter vector describing this transformation.
    fn parameters(&self) -> Vec<f64>;

    /// Replace this transformation's state from a flat parameter vector
    /// laid out as returned by [Transformation::parameters].
    ///
    /// Fails without modifying `self` if the length is wrong.
    fn set_parameters(&mut self, params: &[f64]) -> Result<(), TransformError>;

    /// Partial derivatives of each output coordinate (rows)
    /// with respect to each parameter (columns), evaluated at `pt`.
    fn jacobian(&self, pt: &[f64]) -> Matrix;

    /// Whether this transformation represents the identity,
    /// i.e. input and output are the same number of dimensions
    /// and the coordinate values (and positions) are not changed.
    ///
    /// `true` means it definitely is an identity.
    fn is_identity(&self) -> bool;

    fn kind(&self) -> TransformKind;

    /// Capability query for the concrete affine representation.
    fn as_affine(&self) -> Option<&Affine> {
        None
    }

    fn input_ndim(&self) -> usize;

    fn output_ndim(&self) -> usize;
}

pub(crate) fn check_parameter_count(expected: usize, params: &[f64]) -> Result<(), TransformError> {
    if params.len() != expected {
        return Err(TransformError::InvalidParameterLength {
            expected,
            actual: params.len(),
        });
    }
    Ok(())
}
