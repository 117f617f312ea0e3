use crate::traits::check_parameter_count;
use crate::{Affine, Matrix, TransformError, TransformKind, Transformation};

/// A no-op transform which returns the input point as the output point.
///
/// Defined for one dimensionality. Has no parameters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Identity(usize);

impl Identity {
    pub fn new(ndim: usize) -> Self {
        Self(ndim)
    }
}

impl From<Identity> for Affine {
    fn from(value: Identity) -> Self {
        Affine::identity(value.0)
    }
}

impl Transformation for Identity {
    fn transform_point_into(&self, pt: &[f64], buf: &mut [f64]) {
        buf.copy_from_slice(pt);
    }

    fn transform_vector_into(&self, vec: &[f64], buf: &mut [f64]) {
        buf.copy_from_slice(vec);
    }

    fn column_transform_into(&self, columns: &[&[f64]], bufs: &mut [&mut [f64]]) {
        for (c, b) in columns.iter().zip(bufs.iter_mut()) {
            b.copy_from_slice(c);
        }
    }

    fn inverse_transform(&self) -> Option<Box<dyn Transformation>> {
        Some(Box::new(*self))
    }

    fn number_of_parameters(&self) -> usize {
        0
    }

    fn parameters(&self) -> Vec<f64> {
        vec![]
    }

    fn set_parameters(&mut self, params: &[f64]) -> Result<(), TransformError> {
        check_parameter_count(0, params)
    }

    fn jacobian(&self, _pt: &[f64]) -> Matrix {
        Matrix::zeros(self.0, 0)
    }

    fn is_identity(&self) -> bool {
        true
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Identity
    }

    fn input_ndim(&self) -> usize {
        self.0
    }

    fn output_ndim(&self) -> usize {
        self.0
    }
}
