//! Apply transformations to [ndarray] vectors and point sets.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::{TransformError, Transformation};

/// Run `f` on the input as a slice, copying it first if the view is not contiguous.
fn apply_1d(
    input: ArrayView1<f64>,
    out_ndim: usize,
    f: impl Fn(&[f64], &mut [f64]),
) -> Array1<f64> {
    let mut out = vec![f64::NAN; out_ndim];
    match input.as_slice() {
        Some(slice) => f(slice, &mut out),
        None => f(&input.to_vec(), &mut out),
    }
    Array1::from_vec(out)
}

pub trait NdTransformation: Transformation {
    /// Panics if the length does not match the input dimensionality.
    fn transform_point_nd(&self, pt: ArrayView1<f64>) -> Array1<f64> {
        apply_1d(pt, self.output_ndim(), |p, b| self.transform_point_into(p, b))
    }

    /// Panics if the length does not match the input dimensionality.
    fn transform_vector_nd(&self, vec: ArrayView1<f64>) -> Array1<f64> {
        apply_1d(vec, self.output_ndim(), |v, b| self.transform_vector_into(v, b))
    }

    /// Transform a set of points stored one per row.
    fn transform_points_nd(&self, pts: ArrayView2<f64>) -> Result<Array2<f64>, TransformError> {
        if pts.ncols() != self.input_ndim() {
            return Err(TransformError::DimensionMismatch {
                expected: self.input_ndim(),
                actual: pts.ncols(),
            });
        }
        let out_ndim = self.output_ndim();
        let mut data = Vec::with_capacity(pts.nrows() * out_ndim);
        let mut in_buf = vec![f64::NAN; self.input_ndim()];
        let mut out_buf = vec![f64::NAN; out_ndim];
        for row in pts.rows() {
            for (b, v) in in_buf.iter_mut().zip(row.iter()) {
                *b = *v;
            }
            self.transform_point_into(&in_buf, &mut out_buf);
            data.extend_from_slice(&out_buf);
        }
        Array2::from_shape_vec((pts.nrows(), out_ndim), data)
            .map_err(|e| TransformError::InvalidMatrixShape(e.to_string()))
    }
}

impl<T: Transformation + ?Sized> NdTransformation for T {}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array2, array, s};

    use super::NdTransformation;
    use crate::tests::{COORDS_3D_1000, init_logger};
    use crate::{Affine, AllocatingTransformation, Matrix, Scale};

    fn make_transform() -> Affine {
        #[rustfmt::skip]
        let arr = vec![
            2.0, 0.5, 0.0, 20.0,
            0.0, 1.5, -0.25, -3.0,
            0.1, 0.0, 3.0, 2.5,
        ];
        Affine::try_from_translated(&Matrix::try_new(arr, 4).unwrap()).unwrap()
    }

    #[test]
    fn test_point_matches_slice() {
        init_logger();
        let t = make_transform();
        for pt in COORDS_3D_1000.iter().take(100) {
            let nd = t.transform_point_nd(Array1::from_vec(pt.clone()).view());
            assert_eq!(nd.to_vec().as_slice(), t.transform_point(pt).as_slice());
            let nd = t.transform_vector_nd(Array1::from_vec(pt.clone()).view());
            assert_eq!(nd.to_vec().as_slice(), t.transform_vector(pt).as_slice());
        }
    }

    #[test]
    fn test_non_contiguous_view() {
        let t = Scale::try_new(&[2.0, 3.0]).unwrap();
        let data = array![1.0, 100.0, 2.0, 100.0];
        let strided = data.slice(s![..;2]);
        let out = t.transform_point_nd(strided);
        assert_eq!(out.to_vec(), vec![2.0, 6.0]);
    }

    #[test]
    fn test_points() {
        let t = make_transform();
        let coords: Vec<f64> = COORDS_3D_1000.iter().take(50).flatten().copied().collect();
        let pts = Array2::from_shape_vec((50, 3), coords).unwrap();
        let out = t.transform_points_nd(pts.view()).unwrap();
        assert_eq!(out.dim(), (50, 3));
        for (row, pt) in out.rows().into_iter().zip(COORDS_3D_1000.iter()) {
            assert_eq!(row.to_vec().as_slice(), t.transform_point(pt).as_slice());
        }

        let wrong = Array2::<f64>::zeros((4, 2));
        assert!(t.transform_points_nd(wrong.view()).is_err());
    }
}
