use std::fmt;

use smallvec::{ToSmallVec, smallvec};

use crate::traits::check_parameter_count;
use crate::{Matrix, ShortVec, TransformError, TransformKind, Transformation};

/// An N-dimensional affine transformation, mapping a point `x` to `A·x + b`.
///
/// `A` (the matrix) is square; `b` (the offset) has one entry per dimension.
/// The dimensionality is fixed at construction.
///
/// All composing mutators take a `pre` flag:
/// with `pre == false`, the new operation is applied *after* the existing transformation;
/// with `pre == true`, it is applied *before* it.
#[derive(Debug, Clone, PartialEq)]
pub struct Affine {
    /// Always square, with one row per offset entry.
    matrix: Matrix,
    offset: ShortVec<f64>,
}

impl Affine {
    /// The identity transformation in `ndim` dimensions.
    pub fn identity(ndim: usize) -> Self {
        Self {
            matrix: Matrix::identity(ndim),
            offset: smallvec![0.0; ndim],
        }
    }

    pub fn try_new(matrix: Matrix, offset: &[f64]) -> Result<Self, TransformError> {
        check_square(&matrix)?;
        if matrix.nrows() != offset.len() {
            return Err(TransformError::DimensionMismatch {
                expected: matrix.nrows(),
                actual: offset.len(),
            });
        }
        Ok(Self {
            matrix,
            offset: offset.to_smallvec(),
        })
    }

    /// Create an Affine transform from an augmented matrix,
    /// i.e. which includes the translation as the last column
    /// and a bottom row of [0, 0, ..., 1].
    pub fn try_from_augmented(augmented: &Matrix) -> Result<Self, TransformError> {
        if augmented.nrows() == 0 || !augmented.is_square() {
            return Err(TransformError::InvalidMatrixShape(format!(
                "augmented matrix must be square and non-empty, got {}x{}",
                augmented.nrows(),
                augmented.ncols()
            )));
        }
        let ndim = augmented.nrows() - 1;
        let bottom = augmented.row(ndim);
        let homogeneous = bottom[..ndim].iter().all(|v| *v == 0.0) && bottom[ndim] == 1.0;
        if !homogeneous {
            return Err(TransformError::InvalidMatrixShape(
                "augmented matrix's bottom row must be [0, ..., 0, 1]".into(),
            ));
        }
        Ok(Self::from_translated_rows(augmented, ndim))
    }

    /// Create an Affine transform from a matrix which includes the translation as the last column,
    /// but does not have the augmented matrix's bottom row of [0, 0, ..., 1].
    pub fn try_from_translated(translated: &Matrix) -> Result<Self, TransformError> {
        if translated.ncols() != translated.nrows() + 1 {
            return Err(TransformError::InvalidMatrixShape(format!(
                "translated matrix must have one more column than rows, got {}x{}",
                translated.nrows(),
                translated.ncols()
            )));
        }
        Ok(Self::from_translated_rows(translated, translated.nrows()))
    }

    /// Caller guarantees a square matrix with one row per offset entry.
    pub(crate) fn from_parts(matrix: Matrix, offset: ShortVec<f64>) -> Self {
        debug_assert!(matrix.is_square() && matrix.nrows() == offset.len());
        Self { matrix, offset }
    }

    fn from_translated_rows(source: &Matrix, ndim: usize) -> Self {
        let mut matrix = Matrix::zeros(ndim, ndim);
        let mut offset = ShortVec::with_capacity(ndim);
        for r in 0..ndim {
            let row = source.row(r);
            for (c, v) in row[..ndim].iter().enumerate() {
                matrix[(r, c)] = *v;
            }
            offset.push(row[ndim]);
        }
        Self { matrix, offset }
    }

    /// The (N+1)x(N+1) homogeneous matrix equivalent to this transformation.
    pub fn augmented(&self) -> Matrix {
        let ndim = self.ndim();
        let mut out = Matrix::identity(ndim + 1);
        for r in 0..ndim {
            for (c, v) in self.matrix.row(r).iter().enumerate() {
                out[(r, c)] = *v;
            }
            out[(r, ndim)] = self.offset[r];
        }
        out
    }

    pub fn ndim(&self) -> usize {
        self.offset.len()
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn offset(&self) -> &[f64] {
        &self.offset
    }

    pub fn set_matrix(&mut self, matrix: Matrix) -> Result<(), TransformError> {
        check_square(&matrix)?;
        self.check_ndim(matrix.nrows())?;
        self.matrix = matrix;
        Ok(())
    }

    pub fn set_offset(&mut self, offset: &[f64]) -> Result<(), TransformError> {
        self.check_ndim(offset.len())?;
        self.offset.copy_from_slice(offset);
        Ok(())
    }

    /// Reset to the identity in place, keeping the dimensionality.
    pub fn set_identity(&mut self) {
        *self = Self::identity(self.ndim());
    }

    /// Compose `other` into this transformation in place.
    ///
    /// With `pre == false`, `self` is applied first and then `other`:
    /// `A = A'·A`, `b = A'·b + b'`.
    /// With `pre == true`, `other` is applied first and then `self`:
    /// `A = A·A'`, `b = A·b' + b`.
    pub fn compose(&mut self, other: &Affine, pre: bool) -> Result<(), TransformError> {
        self.check_ndim(other.ndim())?;
        self.compose_unchecked(other, pre);
        Ok(())
    }

    /// As [Affine::compose], but returns a new transformation.
    pub fn composed(&self, other: &Affine, pre: bool) -> Result<Affine, TransformError> {
        let mut out = self.clone();
        out.compose(other, pre)?;
        Ok(out)
    }

    fn compose_unchecked(&mut self, other: &Affine, pre: bool) {
        log::trace!("Affine: composing {}-D transformation, pre={pre}", self.ndim());
        let (first, second) = if pre { (other, &*self) } else { (&*self, other) };
        let mut offset = second.matrix.matmul(&first.offset);
        for (o, b) in offset.iter_mut().zip(second.offset.iter()) {
            *o += b;
        }
        let matrix = second.matrix.matmul_matrix(&first.matrix);
        self.matrix = matrix;
        self.offset = offset;
    }

    /// Compose with a purely linear primitive, which must be `ndim` x `ndim`.
    fn compose_linear(&mut self, linear: Matrix, pre: bool) {
        let primitive = Affine {
            matrix: linear,
            offset: smallvec![0.0; self.ndim()],
        };
        self.compose_unchecked(&primitive, pre);
    }

    /// Compose with a translation.
    ///
    /// With `pre == false` this adds `translation` to the offset;
    /// with `pre == true` it adds `A·translation`.
    pub fn translate(&mut self, translation: &[f64], pre: bool) -> Result<(), TransformError> {
        self.check_ndim(translation.len())?;
        let primitive = Affine {
            matrix: Matrix::identity(self.ndim()),
            offset: translation.to_smallvec(),
        };
        self.compose_unchecked(&primitive, pre);
        Ok(())
    }

    /// Compose with an anisotropic scaling, one factor per axis.
    pub fn scale(&mut self, factors: &[f64], pre: bool) -> Result<(), TransformError> {
        self.check_ndim(factors.len())?;
        self.compose_linear(Matrix::from_diagonal(factors), pre);
        Ok(())
    }

    /// Compose with an isotropic scaling.
    pub fn scale_uniform(&mut self, factor: f64, pre: bool) {
        let factors: ShortVec<f64> = smallvec![factor; self.ndim()];
        self.compose_linear(Matrix::from_diagonal(&factors), pre);
    }

    /// Compose with a rotation by `angle` radians in the plane of two coordinate axes.
    ///
    /// The rotation matrix is the identity except for
    /// `R[a1][a1] = R[a2][a2] = cos`, `R[a1][a2] = sin`, `R[a2][a1] = -sin`,
    /// so the unit vector along `axis1` maps to `cos·e1 - sin·e2`:
    /// a positive angle turns `axis1` away from `axis2`.
    pub fn rotate(
        &mut self,
        axis1: usize,
        axis2: usize,
        angle: f64,
        pre: bool,
    ) -> Result<(), TransformError> {
        self.check_plane(axis1, axis2)?;
        let (sin, cos) = angle.sin_cos();
        let mut rotation = Matrix::identity(self.ndim());
        rotation[(axis1, axis1)] = cos;
        rotation[(axis1, axis2)] = sin;
        rotation[(axis2, axis1)] = -sin;
        rotation[(axis2, axis2)] = cos;
        self.compose_linear(rotation, pre);
        Ok(())
    }

    /// Compose with a counter-clockwise rotation of a 2D transformation.
    pub fn rotate_2d(&mut self, angle: f64, pre: bool) -> Result<(), TransformError> {
        if self.ndim() != 2 {
            return Err(TransformError::DimensionMismatch {
                expected: 2,
                actual: self.ndim(),
            });
        }
        let (sin, cos) = angle.sin_cos();
        self.compose_linear(Matrix::try_new(vec![cos, -sin, sin, cos], 2)?, pre);
        Ok(())
    }

    /// Compose a 3D transformation with a right-handed rotation of `angle` radians
    /// about `axis`, which need not be normalised.
    pub fn rotate_3d(&mut self, axis: &[f64], angle: f64, pre: bool) -> Result<(), TransformError> {
        if self.ndim() != 3 {
            return Err(TransformError::DimensionMismatch {
                expected: 3,
                actual: self.ndim(),
            });
        }
        if axis.len() != 3 {
            return Err(TransformError::DimensionMismatch {
                expected: 3,
                actual: axis.len(),
            });
        }
        let norm = axis.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return Err(TransformError::ZeroRotationAxis);
        }
        let (x, y, z) = (axis[0] / norm, axis[1] / norm, axis[2] / norm);
        let (sin, cos) = angle.sin_cos();
        let t = 1.0 - cos;

        // Rodrigues' rotation formula
        #[rustfmt::skip]
        let data = vec![
            t * x * x + cos,     t * x * y - sin * z, t * x * z + sin * y,
            t * x * y + sin * z, t * y * y + cos,     t * y * z - sin * x,
            t * x * z - sin * y, t * y * z + sin * x, t * z * z + cos,
        ];
        self.compose_linear(Matrix::try_new(data, 3)?, pre);
        Ok(())
    }

    /// Compose with a shear: the identity with `coef` at `[axis1][axis2]`.
    pub fn shear(
        &mut self,
        axis1: usize,
        axis2: usize,
        coef: f64,
        pre: bool,
    ) -> Result<(), TransformError> {
        self.check_plane(axis1, axis2)?;
        let mut shear = Matrix::identity(self.ndim());
        shear[(axis1, axis2)] = coef;
        self.compose_linear(shear, pre);
        Ok(())
    }

    /// The inverse transformation, or `None` if the matrix is singular.
    ///
    /// The inverse has matrix `A⁻¹` and offset `-A⁻¹·b`.
    pub fn inverse(&self) -> Option<Affine> {
        let Some(matrix) = self.matrix.inverse() else {
            log::debug!("Affine: {}-D matrix is singular, no inverse", self.ndim());
            return None;
        };
        let offset = matrix.matmul(&self.offset).iter().map(|v| -v).collect();
        Some(Affine { matrix, offset })
    }

    /// Map a point from the output space back into the input space.
    pub fn back_transform_point(&self, pt: &[f64]) -> Result<ShortVec<f64>, TransformError> {
        let inverse = self.inverse().ok_or(TransformError::SingularMatrix)?;
        let mut out = smallvec![f64::NAN; self.ndim()];
        inverse.transform_point_into(pt, &mut out);
        Ok(out)
    }

    /// Map a free vector from the output space back into the input space.
    pub fn back_transform_vector(&self, vec: &[f64]) -> Result<ShortVec<f64>, TransformError> {
        let inverse = self.inverse().ok_or(TransformError::SingularMatrix)?;
        Ok(inverse.matrix.matmul(vec))
    }

    /// Euclidean distance between the parameter vectors of two transformations.
    pub fn metric(&self, other: &Affine) -> Result<f64, TransformError> {
        self.check_ndim(other.ndim())?;
        Ok(self.squared_distance(other).sqrt())
    }

    /// Euclidean distance between this transformation's parameters and the identity's.
    pub fn metric_to_identity(&self) -> f64 {
        self.squared_distance(&Affine::identity(self.ndim())).sqrt()
    }

    fn squared_distance(&self, other: &Affine) -> f64 {
        self.matrix
            .as_slice()
            .iter()
            .zip(other.matrix.as_slice())
            .chain(self.offset.iter().zip(other.offset.iter()))
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    fn check_ndim(&self, actual: usize) -> Result<(), TransformError> {
        if actual != self.ndim() {
            return Err(TransformError::DimensionMismatch {
                expected: self.ndim(),
                actual,
            });
        }
        Ok(())
    }

    fn check_plane(&self, axis1: usize, axis2: usize) -> Result<(), TransformError> {
        for axis in [axis1, axis2] {
            if axis >= self.ndim() {
                return Err(TransformError::AxisOutOfRange {
                    axis,
                    ndim: self.ndim(),
                });
            }
        }
        if axis1 == axis2 {
            return Err(TransformError::RepeatedAxis { axis: axis1 });
        }
        Ok(())
    }
}

fn check_square(matrix: &Matrix) -> Result<(), TransformError> {
    if !matrix.is_square() {
        return Err(TransformError::InvalidMatrixShape(format!(
            "affine matrix must be square, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    Ok(())
}

impl fmt::Display for Affine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Affine ({}-D)", self.ndim())?;
        writeln!(f, "  Matrix:")?;
        for r in 0..self.ndim() {
            writeln!(f, "    {:?}", self.matrix.row(r))?;
        }
        write!(f, "  Offset: {:?}", self.offset.as_slice())
    }
}

impl Transformation for Affine {
    fn transform_point_into(&self, pt: &[f64], buf: &mut [f64]) {
        self.matrix.matmul_into(pt, buf);
        for (o, t) in buf.iter_mut().zip(self.offset.iter()) {
            *o += t;
        }
    }

    fn transform_vector_into(&self, vec: &[f64], buf: &mut [f64]) {
        self.matrix.matmul_into(vec, buf);
    }

    fn column_transform_into(&self, columns: &[&[f64]], bufs: &mut [&mut [f64]]) {
        self.matrix.matmul_transposed_into(columns, bufs);
        for (col, t) in bufs.iter_mut().zip(self.offset.iter()) {
            for c in col.iter_mut() {
                *c += t;
            }
        }
    }

    fn inverse_transform(&self) -> Option<Box<dyn Transformation>> {
        self.inverse()
            .map(|inv| Box::new(inv) as Box<dyn Transformation>)
    }

    fn number_of_parameters(&self) -> usize {
        let ndim = self.ndim();
        ndim * ndim + ndim
    }

    /// Matrix entries in row-major order, followed by the offset.
    fn parameters(&self) -> Vec<f64> {
        let mut params = Vec::with_capacity(self.number_of_parameters());
        params.extend_from_slice(self.matrix.as_slice());
        params.extend_from_slice(&self.offset);
        params
    }

    fn set_parameters(&mut self, params: &[f64]) -> Result<(), TransformError> {
        check_parameter_count(self.number_of_parameters(), params)?;
        let (matrix, offset) = params.split_at(self.ndim() * self.ndim());
        self.matrix.as_mut_slice().copy_from_slice(matrix);
        self.offset.copy_from_slice(offset);
        Ok(())
    }

    fn jacobian(&self, pt: &[f64]) -> Matrix {
        let ndim = self.ndim();
        let mut jacobian = Matrix::zeros(ndim, self.number_of_parameters());
        for row in 0..ndim {
            for (col, p) in pt[..ndim].iter().enumerate() {
                jacobian[(row, row * ndim + col)] = *p;
            }
            jacobian[(row, ndim * ndim + row)] = 1.0;
        }
        jacobian
    }

    fn is_identity(&self) -> bool {
        if self.offset.iter().any(|t| *t != 0.0) {
            return false;
        }
        self.matrix.is_identity()
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Affine
    }

    fn as_affine(&self) -> Option<&Affine> {
        Some(self)
    }

    fn input_ndim(&self) -> usize {
        self.ndim()
    }

    fn output_ndim(&self) -> usize {
        self.ndim()
    }
}
