use smallvec::ToSmallVec;

use crate::traits::check_parameter_count;
use crate::{Affine, Matrix, ShortVec, TransformError, TransformKind, Transformation};

/// Translate each coordinate by adding a constant value.
///
/// The parameters are the per-axis translations.
#[derive(Debug, Clone, PartialEq)]
pub struct Translate(ShortVec<f64>);

impl Translate {
    pub fn try_new(translate: &[f64]) -> Result<Self, TransformError> {
        if translate.iter().any(|t| !t.is_finite()) {
            return Err(TransformError::NonFinite("translation"));
        }
        Ok(Self(translate.to_smallvec()))
    }

    pub fn translation(&self) -> &[f64] {
        &self.0
    }
}

impl From<Translate> for Affine {
    fn from(value: Translate) -> Self {
        Affine::from_parts(Matrix::identity(value.0.len()), value.0)
    }
}

impl Transformation for Translate {
    fn transform_point_into(&self, pt: &[f64], buf: &mut [f64]) {
        for ((o, p), t) in buf.iter_mut().zip(pt.iter()).zip(self.0.iter()) {
            *o = t + p;
        }
    }

    fn transform_vector_into(&self, vec: &[f64], buf: &mut [f64]) {
        buf.copy_from_slice(vec);
    }

    fn column_transform_into(&self, columns: &[&[f64]], bufs: &mut [&mut [f64]]) {
        for ((col_in, buf_in), t) in columns.iter().zip(bufs.iter_mut()).zip(self.0.iter()) {
            for (c, b) in col_in.iter().zip(buf_in.iter_mut()) {
                *b = c + t;
            }
        }
    }

    fn inverse_transform(&self) -> Option<Box<dyn Transformation>> {
        Some(Box::new(Translate(self.0.iter().map(|t| -t).collect())))
    }

    fn number_of_parameters(&self) -> usize {
        self.0.len()
    }

    fn parameters(&self) -> Vec<f64> {
        self.0.to_vec()
    }

    fn set_parameters(&mut self, params: &[f64]) -> Result<(), TransformError> {
        check_parameter_count(self.0.len(), params)?;
        self.0.copy_from_slice(params);
        Ok(())
    }

    fn jacobian(&self, _pt: &[f64]) -> Matrix {
        Matrix::identity(self.0.len())
    }

    fn is_identity(&self) -> bool {
        self.0.iter().all(|t| *t == 0.0)
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Translate
    }

    fn input_ndim(&self) -> usize {
        self.0.len()
    }

    fn output_ndim(&self) -> usize {
        self.0.len()
    }
}
