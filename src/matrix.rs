use std::fmt;
use std::ops::{Index, IndexMut};

use crate::{ShortVec, TransformError};

/// Matrices whose determinant is at or below this fraction of the product of their row norms
/// are treated as singular.
pub const SINGULAR_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    /// Row-major / C-ordered matrix data.
    data: Vec<f64>,
    nrows: usize,
    ncols: usize,
}

impl AsRef<Matrix> for Matrix {
    fn as_ref(&self) -> &Matrix {
        self
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        self.get(index.0, index.1)
            .expect("index should be in bounds")
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        self.get_mut(index.0, index.1)
            .expect("index should be in bounds")
    }
}

impl Matrix {
    pub fn builder(row_vecs: bool) -> MatrixBuilder {
        MatrixBuilder::new(row_vecs)
    }

    /// Row-major/ C order data
    pub fn try_new(data: Vec<f64>, ncols: usize) -> Result<Self, TransformError> {
        if ncols == 0 {
            return Err(TransformError::InvalidMatrixShape(
                "ncols must be nonzero; use Matrix::zeros for empty matrices".into(),
            ));
        }
        if data.len() % ncols != 0 {
            return Err(TransformError::InvalidMatrixShape(format!(
                "data length {} is not divisible by ncols {}",
                data.len(),
                ncols
            )));
        }
        let nrows = data.len() / ncols;
        Ok(Self { data, nrows, ncols })
    }

    /// Column-major/ Fortran order data
    pub fn try_new_colmaj(data: Vec<f64>, nrows: usize) -> Result<Self, TransformError> {
        if nrows == 0 {
            return Err(TransformError::InvalidMatrixShape(
                "nrows must be nonzero; use Matrix::zeros for empty matrices".into(),
            ));
        }
        if data.len() % nrows != 0 {
            return Err(TransformError::InvalidMatrixShape(format!(
                "data length {} is not divisible by nrows {}",
                data.len(),
                nrows
            )));
        }
        let ncols = data.len() / nrows;
        let mut rowmaj = vec![0.0; data.len()];
        for (f_idx, val) in data.into_iter().enumerate() {
            let r = f_idx % nrows;
            let c = f_idx / nrows;
            rowmaj[r * ncols + c] = val;
        }
        Ok(Self {
            data: rowmaj,
            nrows,
            ncols,
        })
    }

    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            data: vec![0.0; nrows * ncols],
            nrows,
            ncols,
        }
    }

    pub fn identity(ndim: usize) -> Self {
        let mut out = Self::zeros(ndim, ndim);
        for idx in 0..ndim {
            out[(idx, idx)] = 1.0;
        }
        out
    }

    /// Square matrix with the given values on the diagonal.
    pub fn from_diagonal(diagonal: &[f64]) -> Self {
        let mut out = Self::zeros(diagonal.len(), diagonal.len());
        for (idx, d) in diagonal.iter().enumerate() {
            out[(idx, idx)] = *d;
        }
        out
    }

    pub fn transpose(&self) -> Matrix {
        let mut data = vec![0.0; self.data.len()];
        for r in 0..self.nrows {
            for c in 0..self.ncols {
                data[c * self.nrows + r] = self[(r, c)];
            }
        }
        Matrix {
            data,
            nrows: self.ncols,
            ncols: self.nrows,
        }
    }

    pub fn matmul(&self, coord: &[f64]) -> ShortVec<f64> {
        let mut result = smallvec::smallvec![f64::NAN; self.nrows];
        self.matmul_into(coord, &mut result);
        result
    }

    pub fn matmul_into(&self, coord: &[f64], buf: &mut [f64]) {
        buf.fill(0.0);
        for (idx, d) in self.data.iter().enumerate() {
            let r = idx / self.ncols;
            let c = idx % self.ncols;
            buf[r] += d * coord[c];
        }
    }

    /// N.B. Coordinate "columns" are the _rows_ of the input and output matrices.
    pub fn matmul_transposed_into(&self, coord_cols: &[&[f64]], buf: &mut [&mut [f64]]) {
        for (out_dim_idx, buf_col) in buf.iter_mut().enumerate() {
            buf_col.fill(0.0);
            let row = self.row(out_dim_idx);
            for (mat_val, coord_col) in row.iter().zip(coord_cols.iter()) {
                // our hottest loop is iterating over long arrays in lock step
                for (c, b) in coord_col.iter().zip(buf_col.iter_mut()) {
                    *b += c * mat_val;
                }
            }
        }
    }

    /// Matrix product `self · other`.
    ///
    /// Panics if `self.ncols() != other.nrows()`.
    pub fn matmul_matrix(&self, other: &Matrix) -> Matrix {
        if self.ncols != other.nrows {
            panic!(
                "matmul_matrix: inner dimension mismatch: {}x{} · {}x{}",
                self.nrows, self.ncols, other.nrows, other.ncols
            );
        }
        let mut out = Matrix::zeros(self.nrows, other.ncols);
        for r in 0..self.nrows {
            for (k, a) in self.row(r).iter().enumerate() {
                for (o, b) in out.row_mut(r).iter_mut().zip(other.row(k).iter()) {
                    *o += a * b;
                }
            }
        }
        out
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&f64> {
        if row >= self.nrows || col >= self.ncols {
            return None;
        }
        self.data.get(row * self.ncols + col)
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut f64> {
        if row >= self.nrows || col >= self.ncols {
            return None;
        }
        self.data.get_mut(row * self.ncols + col)
    }

    /// Panics if `row` is out of bounds.
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.ncols;
        &self.data[start..(start + self.ncols)]
    }

    fn row_mut(&mut self, row: usize) -> &mut [f64] {
        let start = row * self.ncols;
        &mut self.data[start..(start + self.ncols)]
    }

    /// Row-major data.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    pub fn is_identity(&self) -> bool {
        if !self.is_square() {
            return false;
        }
        self.data.iter().enumerate().all(|(idx, v)| {
            let expected = if idx / self.ncols == idx % self.ncols {
                1.0
            } else {
                0.0
            };
            *v == expected
        })
    }

    /// Copy with every row divided by its Euclidean norm; `None` if any row is all zeros.
    fn row_normalized(&self) -> Option<Matrix> {
        let mut out = self.clone();
        for r in 0..self.nrows {
            let row = out.row_mut(r);
            let norm = row.iter().fold(0.0_f64, |acc, v| acc.hypot(*v));
            if norm == 0.0 {
                return None;
            }
            row.iter_mut().for_each(|v| *v /= norm);
        }
        Some(out)
    }

    /// Whether the determinant is within [SINGULAR_TOLERANCE] of zero,
    /// relative to the product of the row norms (its largest possible magnitude).
    ///
    /// Non-square matrices and matrices with non-finite entries count as singular.
    pub fn is_singular(&self) -> bool {
        if !self.is_square() || !self.data.iter().all(|v| v.is_finite()) {
            return true;
        }
        let Some(normalized) = self.row_normalized() else {
            return true;
        };
        match normalized.determinant() {
            Ok(det) => !det.is_finite() || det.abs() <= SINGULAR_TOLERANCE,
            Err(_) => true,
        }
    }

    /// Determinant by LU decomposition with partial pivoting.
    pub fn determinant(&self) -> Result<f64, TransformError> {
        if !self.is_square() {
            return Err(TransformError::InvalidMatrixShape(
                "determinant only defined for square matrices".to_string(),
            ));
        }
        let n = self.nrows;
        let mut lu = self.data.clone();
        let mut det = 1.0;
        for col in 0..n {
            let pivot_row = pivot_row(&lu, n, col);
            let pivot = lu[pivot_row * n + col];
            if pivot == 0.0 {
                return Ok(0.0);
            }
            if pivot_row != col {
                swap_rows(&mut lu, n, pivot_row, col);
                det = -det;
            }
            det *= pivot;
            for r in (col + 1)..n {
                let factor = lu[r * n + col] / pivot;
                for c in col..n {
                    let above = lu[col * n + c];
                    lu[r * n + c] -= factor * above;
                }
            }
        }
        Ok(det)
    }

    /// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
    ///
    /// Returns `None` for non-square and singular matrices (see [Matrix::is_singular]).
    pub fn inverse(&self) -> Option<Matrix> {
        if self.is_singular() {
            return None;
        }
        let n = self.nrows;

        let mut work = self.data.clone();
        let mut inv = Matrix::identity(n);
        for col in 0..n {
            let pivot_row = pivot_row(&work, n, col);
            if work[pivot_row * n + col] == 0.0 {
                return None;
            }
            if pivot_row != col {
                swap_rows(&mut work, n, pivot_row, col);
                swap_rows(&mut inv.data, n, pivot_row, col);
            }

            let pivot = work[col * n + col];
            for c in 0..n {
                work[col * n + c] /= pivot;
                inv.data[col * n + c] /= pivot;
            }

            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = work[r * n + col];
                if factor == 0.0 {
                    continue;
                }
                for c in 0..n {
                    let w = work[col * n + c];
                    let i = inv.data[col * n + c];
                    work[r * n + c] -= factor * w;
                    inv.data[r * n + c] -= factor * i;
                }
            }
        }
        Some(inv)
    }
}

/// Row index (at or below `col`) holding the largest absolute value in column `col`.
fn pivot_row(data: &[f64], n: usize, col: usize) -> usize {
    let mut best = col;
    let mut best_abs = data[col * n + col].abs();
    for r in (col + 1)..n {
        let candidate = data[r * n + col].abs();
        if candidate > best_abs {
            best = r;
            best_abs = candidate;
        }
    }
    best
}

fn swap_rows(data: &mut [f64], ncols: usize, r1: usize, r2: usize) {
    for c in 0..ncols {
        data.swap(r1 * ncols + c, r2 * ncols + c);
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.nrows {
            if r > 0 {
                writeln!(f)?;
            }
            write!(f, "[")?;
            for (c, v) in self.row(r).iter().enumerate() {
                if c > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{v}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MatrixBuilder {
    row_vecs: bool,
    dim_len: Option<usize>,
    data: Vec<f64>,
}

impl MatrixBuilder {
    fn new(row_vecs: bool) -> Self {
        Self {
            row_vecs,
            dim_len: None,
            data: Default::default(),
        }
    }

    pub fn add_vec(&mut self, vec: &[f64]) -> Result<&mut Self, TransformError> {
        if let Some(len) = self.dim_len {
            if len != vec.len() {
                return Err(TransformError::DimensionMismatch {
                    expected: len,
                    actual: vec.len(),
                });
            }
        } else {
            self.dim_len = Some(vec.len());
        }
        self.data.extend_from_slice(vec);
        Ok(self)
    }

    pub fn build(self) -> Result<Matrix, TransformError> {
        let dim_len = self.dim_len.unwrap_or(0);
        if dim_len == 0 {
            return Ok(Matrix::zeros(0, 0));
        }
        if self.row_vecs {
            Matrix::try_new(self.data, dim_len)
        } else {
            Matrix::try_new_colmaj(self.data, dim_len)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::init_logger;
    use crate::{as_muts, as_refs, vec_of_vec};

    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq, assert_ulps_eq};
    use faer::rand::SeedableRng;
    use faer::stats::prelude::{Rng, SmallRng};

    fn new_rng() -> SmallRng {
        SmallRng::seed_from_u64(1991)
    }

    fn random_matrix(rng: &mut SmallRng, ndim: usize) -> Matrix {
        let mut data = vec![];
        for _ in 0..(ndim * ndim) {
            data.push(rng.random::<f64>() * 10.0);
        }
        Matrix::try_new(data, ndim).unwrap()
    }

    #[test]
    fn test_determinant() {
        let mut rng = new_rng();
        for idx in 0..100 {
            let ndim = idx / 10 + 1;
            let my_mat = random_matrix(&mut rng, ndim);
            let my_det = my_mat.determinant().unwrap();

            let faer_mat = faer::Mat::from_fn(my_mat.nrows(), my_mat.ncols(), |row, col| {
                my_mat[(row, col)]
            });
            let faer_det = faer_mat.determinant();
            println!("iteration={idx}, ndim={ndim}, my_det={my_det}, faer_det={faer_det}");
            assert_relative_eq!(my_det, faer_det, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_determinant_singular() {
        let mat = Matrix::try_new(vec![1.0, 2.0, 2.0, 4.0], 2).unwrap();
        assert_abs_diff_eq!(mat.determinant().unwrap(), 0.0, epsilon = 1e-12);
        assert!(Matrix::zeros(2, 3).determinant().is_err());
    }

    #[test]
    fn test_inverse_2d() {
        let mat = Matrix::try_new(vec![1.0, 2.0, 3.0, 4.0], 2).unwrap();
        let inv = mat.inverse().unwrap();
        let expected: [f64; 4] = [-2.0, 1.0, 1.5, -0.5];
        assert_abs_diff_eq!(inv.as_slice(), expected.as_slice(), epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_random() {
        init_logger();
        let mut rng = new_rng();
        for idx in 0..60 {
            let ndim = idx / 10 + 1;
            let mut mat = random_matrix(&mut rng, ndim);
            // diagonally dominant, so certainly invertible
            for d in 0..ndim {
                mat[(d, d)] += 10.0 * ndim as f64;
            }
            let inv = mat.inverse().unwrap();
            let product = mat.matmul_matrix(&inv);
            let identity = Matrix::identity(ndim);
            assert_abs_diff_eq!(
                product.as_slice(),
                identity.as_slice(),
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn test_inverse_matches_faer() {
        use faer::linalg::solvers::DenseSolveCore;

        let mut rng = new_rng();
        for idx in 0..60 {
            let ndim = idx / 10 + 1;
            let mut mat = random_matrix(&mut rng, ndim);
            for d in 0..ndim {
                mat[(d, d)] += 10.0 * ndim as f64;
            }
            let inv = mat.inverse().unwrap();

            let faer_mat = faer::Mat::from_fn(ndim, ndim, |row, col| mat[(row, col)]);
            let faer_inv = faer_mat.partial_piv_lu().inverse();
            for row in 0..ndim {
                for col in 0..ndim {
                    assert_relative_eq!(
                        inv[(row, col)],
                        faer_inv[(row, col)],
                        epsilon = 1e-12,
                        max_relative = 1e-9
                    );
                }
            }
        }
    }

    #[test]
    fn test_inverse_badly_scaled() {
        let mat = Matrix::from_diagonal(&[1e6, 1e-7]);
        assert!(!mat.is_singular());
        let inv = mat.inverse().unwrap();
        assert_relative_eq!(inv[(0, 0)], 1e-6, max_relative = 1e-12);
        assert_relative_eq!(inv[(1, 1)], 1e7, max_relative = 1e-12);
        assert_eq!(inv[(0, 1)], 0.0);
        assert_eq!(inv[(1, 0)], 0.0);

        #[rustfmt::skip]
        let mixed = Matrix::try_new(vec![
            1e8, 2e8, 0.0,
            3e-6, -1e-6, 0.0,
            0.0, 0.0, 1.0,
        ], 3).unwrap();
        let inv = mixed.inverse().unwrap();
        assert_abs_diff_eq!(
            mixed.matmul_matrix(&inv).as_slice(),
            Matrix::identity(3).as_slice(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_inverse_non_finite() {
        let nan = Matrix::try_new(vec![f64::NAN, 0.0, 0.0, 1.0], 2).unwrap();
        assert!(nan.is_singular());
        assert!(nan.inverse().is_none());
        let inf = Matrix::try_new(vec![1.0, f64::INFINITY, 0.0, 1.0], 2).unwrap();
        assert!(inf.inverse().is_none());
    }

    #[test]
    fn test_inverse_needs_pivoting() {
        let mat = Matrix::try_new(vec![0.0, 1.0, 1.0, 0.0], 2).unwrap();
        let inv = mat.inverse().unwrap();
        assert_eq!(inv, mat);
    }

    #[test]
    fn test_inverse_singular() {
        assert!(Matrix::zeros(3, 3).inverse().is_none());
        let rank_deficient = Matrix::try_new(
            vec![1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 1.0, 1.0],
            3,
        )
        .unwrap();
        assert!(rank_deficient.inverse().is_none());
        assert!(Matrix::zeros(2, 3).inverse().is_none());
    }

    #[test]
    fn test_inverse_tiny_scale() {
        // singularity is judged relative to the matrix's own magnitude
        let mat = Matrix::from_diagonal(&[1e-20, 2e-20]);
        let inv = mat.inverse().unwrap();
        assert_relative_eq!(inv[(0, 0)], 1e20, max_relative = 1e-12);
        assert_relative_eq!(inv[(1, 1)], 5e19, max_relative = 1e-12);
    }

    #[test]
    fn test_matmul_into() {
        #[rustfmt::skip]
        let data = vec![
            1.0, 2.0, 3.0,
            4.0, 5.0, 6.0,
            7.0, 8.0, 9.0
        ];
        let mat = Matrix::try_new(data, 3).unwrap();
        let mut out = vec![f64::NAN; 3];
        mat.matmul_into(&[10.0, 100.0, 1000.0], &mut out);
        let expected: [f64; 3] = [3210.0, 6540.0, 9870.0];
        assert_ulps_eq!(out.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_matmul_matrix() {
        let a = Matrix::try_new(vec![6.0, 5.0, 4.0, 3.0], 2).unwrap();
        let product = a.matmul_matrix(&a);
        let expected: [f64; 4] = [56.0, 45.0, 36.0, 29.0];
        assert_ulps_eq!(product.as_slice(), expected.as_slice());

        let wide = Matrix::try_new(vec![1.0, 2.0, 3.0], 3).unwrap();
        let tall = wide.transpose();
        assert_eq!(wide.matmul_matrix(&tall).as_slice(), &[14.0]);
        assert_eq!(tall.matmul_matrix(&wide).nrows(), 3);
    }

    #[test]
    fn test_matmul_columns_into() {
        init_logger();
        #[rustfmt::skip]
        let data = vec![
            1.0, 2.0, 3.0,
            4.0, 5.0, 6.0,
            7.0, 8.0, 9.0
        ];
        let mat = Matrix::try_new(data, 3).unwrap();

        let col_len = 5;
        let mut out = vec_of_vec(3, col_len, f64::NAN);
        let mut out_muts = as_muts(&mut out);

        let columns = vec![
            vec![10.0; col_len],
            vec![100.0; col_len],
            vec![1000.0; col_len],
        ];
        let col_refs = as_refs(&columns);

        mat.matmul_transposed_into(&col_refs, &mut out_muts);

        let expected: [f64; 3] = [3210.0, 6540.0, 9870.0];
        for idx in 0..col_len {
            let got: Vec<_> = out.iter().map(|c| c[idx]).collect();
            assert_ulps_eq!(got.as_slice(), expected.as_slice());
        }
    }

    #[test]
    fn test_builder_orders() {
        let mut rows = Matrix::builder(true);
        rows.add_vec(&[1.0, 2.0, 3.0]).unwrap();
        rows.add_vec(&[4.0, 5.0, 6.0]).unwrap();
        let by_rows = rows.build().unwrap();
        assert_eq!((by_rows.nrows(), by_rows.ncols()), (2, 3));

        let mut cols = Matrix::builder(false);
        cols.add_vec(&[1.0, 4.0]).unwrap();
        cols.add_vec(&[2.0, 5.0]).unwrap();
        cols.add_vec(&[3.0, 6.0]).unwrap();
        assert_eq!(cols.build().unwrap(), by_rows);

        let mut bad = Matrix::builder(true);
        bad.add_vec(&[1.0, 2.0]).unwrap();
        assert!(matches!(
            bad.add_vec(&[1.0]),
            Err(TransformError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_try_new_rejects_ragged() {
        assert!(Matrix::try_new(vec![1.0, 2.0, 3.0], 2).is_err());
        assert!(Matrix::try_new(vec![], 0).is_err());
    }

    #[test]
    fn test_identity_and_display() {
        let id = Matrix::identity(3);
        assert!(id.is_identity());
        assert!(!Matrix::zeros(3, 3).is_identity());
        assert!(!Matrix::from_diagonal(&[1.0, 2.0]).is_identity());
        assert_eq!(format!("{}", Matrix::identity(2)), "[1, 0]\n[0, 1]");
    }
}
