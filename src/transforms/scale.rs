use smallvec::{ToSmallVec, smallvec};

use crate::traits::check_parameter_count;
use crate::{Affine, Matrix, ShortVec, TransformError, TransformKind, Transformation};

/// Multiply each coordinate value by a constant factor.
///
/// The parameters are the per-axis factors.
/// Negative factors reflect; a zero factor makes the transform non-invertible.
#[derive(Debug, Clone, PartialEq)]
pub struct Scale(ShortVec<f64>);

impl Scale {
    pub fn try_new(scale: &[f64]) -> Result<Self, TransformError> {
        for s in scale.iter() {
            if s.is_nan() || s.is_infinite() {
                return Err(TransformError::NonFinite("scale factor"));
            }
        }
        Ok(Self(scale.to_smallvec()))
    }

    pub fn factors(&self) -> &[f64] {
        &self.0
    }
}

impl From<Scale> for Affine {
    fn from(value: Scale) -> Self {
        let offset = smallvec![0.0; value.0.len()];
        Affine::from_parts(Matrix::from_diagonal(&value.0), offset)
    }
}

impl Transformation for Scale {
    fn transform_point_into(&self, pt: &[f64], buf: &mut [f64]) {
        for ((o, p), s) in buf.iter_mut().zip(pt.iter()).zip(self.0.iter()) {
            *o = s * p;
        }
    }

    fn transform_vector_into(&self, vec: &[f64], buf: &mut [f64]) {
        self.transform_point_into(vec, buf);
    }

    fn column_transform_into(&self, columns: &[&[f64]], bufs: &mut [&mut [f64]]) {
        for ((col_in, buf_in), s) in columns.iter().zip(bufs.iter_mut()).zip(self.0.iter()) {
            for (c, b) in col_in.iter().zip(buf_in.iter_mut()) {
                *b = c * s;
            }
        }
    }

    fn inverse_transform(&self) -> Option<Box<dyn Transformation>> {
        if self.0.iter().any(|s| *s == 0.0) {
            log::debug!("Scale: zero factor, no inverse");
            return None;
        }
        Some(Box::new(Scale(self.0.iter().map(|s| 1.0 / s).collect())))
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

    /// Diagonal: each output coordinate depends only on its own factor.
    fn jacobian(&self, pt: &[f64]) -> Matrix {
        Matrix::from_diagonal(&pt[..self.0.len()])
    }

    fn is_identity(&self) -> bool {
        self.0.iter().all(|s| *s == 1.0)
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Scale
    }

    fn input_ndim(&self) -> usize {
        self.0.len()
    }

    fn output_ndim(&self) -> usize {
        self.0.len()
    }
}
