use super::{
    branch_opt_util,
    error::BPIRError,
    params::{CHECK_MATRIX_SEED_SPREAD, ENCODING_MATRIX_MAX_ENTRY, PIVOT_TOLERANCE, SINGULAR_VALUE_TOLERANCE, SVD_MAX_SWEEPS, SVD_ORTHOGONALITY_TOLERANCE},
};
use rand::prelude::*;
use rayon::prelude::*;
use std::ops::{Index, IndexMut, Mul};

/// Dense, row-major, real-valued matrix. Used for everything the protocol does in floating point:
/// encoding matrix and its pseudo-inverse, check matrix, verification table.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    elems: Vec<f64>,
}

/// Thin singular value decomposition `A = U Σ Vᵗ`, where `p = min(rows, cols)`, `U` is `rows x p`, `Σ` has `p` entries and `V` is `cols x p`.
pub struct Svd {
    pub u: Matrix,
    pub sigma: Vec<f64>,
    pub v: Matrix,
}

impl Matrix {
    /// Creates a new matrix with the given number of rows and columns, s.t. all elements are zero-initialized.
    ///
    /// # Arguments
    ///
    /// * `rows` - The number of rows in the matrix.
    /// * `cols` - The number of columns in the matrix.
    ///
    /// # Returns
    ///
    /// * `Result<Matrix, BPIRError>` - A new matrix if both rows and cols are positive.
    pub fn new(rows: usize, cols: usize) -> Result<Matrix, BPIRError> {
        if branch_opt_util::likely((rows > 0) && (cols > 0)) {
            Ok(Matrix {
                rows,
                cols,
                elems: vec![0.0; rows * cols],
            })
        } else {
            Err(BPIRError::InvalidMatrixDimension)
        }
    }

    /// Creates a new matrix with the given number of rows and columns, s.t. elements are initialized with the given values, in row-major order.
    pub fn from_values(rows: usize, cols: usize, values: Vec<f64>) -> Result<Matrix, BPIRError> {
        if branch_opt_util::likely((rows > 0) && (cols > 0)) {
            if branch_opt_util::likely(rows * cols == values.len()) {
                Ok(Matrix { rows, cols, elems: values })
            } else {
                Err(BPIRError::InvalidNumberOfElementsInMatrix)
            }
        } else {
            Err(BPIRError::InvalidMatrixDimension)
        }
    }

    pub fn identity(rows: usize) -> Result<Matrix, BPIRError> {
        let mut mat = Matrix::new(rows, rows)?;

        (0..rows).for_each(|idx| {
            mat[(idx, idx)] = 1.0;
        });

        Ok(mat)
    }

    #[inline(always)]
    pub const fn num_rows(&self) -> usize {
        self.rows
    }
    #[inline(always)]
    pub const fn num_cols(&self) -> usize {
        self.cols
    }

    pub fn transpose(&self) -> Matrix {
        let mut elems = vec![0.0; self.rows * self.cols];

        (0..self.cols)
            .flat_map(|ridx| (0..self.rows).map(move |cidx| (ridx, cidx)))
            .for_each(|(ridx, cidx)| {
                elems[ridx * self.rows + cidx] = self[(cidx, ridx)];
            });

        Matrix {
            rows: self.cols,
            cols: self.rows,
            elems,
        }
    }

    pub fn column(&self, cidx: usize) -> Result<Vec<f64>, BPIRError> {
        if branch_opt_util::unlikely(cidx >= self.cols) {
            return Err(BPIRError::MatrixIndexOutOfRange(cidx, self.cols));
        }

        Ok((0..self.rows).map(|ridx| self[(ridx, cidx)]).collect())
    }

    /// Builds a new matrix out of the requested rows, in the order they are requested.
    pub fn select_rows(&self, row_indices: &[usize]) -> Result<Matrix, BPIRError> {
        if let Some(&bad_idx) = row_indices.iter().find(|&&ridx| ridx >= self.rows) {
            return Err(BPIRError::MatrixIndexOutOfRange(bad_idx, self.rows));
        }

        let elems = row_indices
            .iter()
            .flat_map(|&ridx| self.elems[ridx * self.cols..(ridx + 1) * self.cols].iter().copied())
            .collect::<Vec<f64>>();

        Matrix::from_values(row_indices.len(), self.cols, elems)
    }

    /// Builds a new matrix out of the requested columns, in the order they are requested.
    pub fn select_cols(&self, col_indices: &[usize]) -> Result<Matrix, BPIRError> {
        if let Some(&bad_idx) = col_indices.iter().find(|&&cidx| cidx >= self.cols) {
            return Err(BPIRError::MatrixIndexOutOfRange(bad_idx, self.cols));
        }

        let elems = (0..self.rows)
            .flat_map(|ridx| col_indices.iter().map(move |&cidx| (ridx, cidx)))
            .map(|(ridx, cidx)| self[(ridx, cidx)])
            .collect::<Vec<f64>>();

        Matrix::from_values(self.rows, col_indices.len(), elems)
    }

    /// Computes `self · vector`, treating `vector` as a column vector.
    pub fn mul_vec(&self, vector: &[f64]) -> Result<Vec<f64>, BPIRError> {
        if branch_opt_util::unlikely(vector.len() != self.cols) {
            return Err(BPIRError::IncompatibleDimensionForMatrixVectorMultiplication);
        }

        Ok(self
            .elems
            .par_chunks_exact(self.cols)
            .map(|row| row.iter().zip(vector).map(|(a, b)| a * b).sum())
            .collect())
    }

    /// Computes thin singular value decomposition using one-sided Jacobi rotations.
    ///
    /// Wide matrices are handled by decomposing the transpose and swapping the roles of `U` and `V`.
    pub fn svd(&self) -> Result<Svd, BPIRError> {
        if self.rows >= self.cols {
            self.one_sided_jacobi()
        } else {
            let Svd { u, sigma, v } = self.transpose().one_sided_jacobi()?;
            Ok(Svd { u: v, sigma, v: u })
        }
    }

    /// Number of singular values strictly greater than `SINGULAR_VALUE_TOLERANCE`.
    pub fn rank(&self) -> Result<usize, BPIRError> {
        let svd = self.svd()?;
        Ok(svd.sigma.iter().filter(|&&s| s.abs() > SINGULAR_VALUE_TOLERANCE).count())
    }

    /// Computes Moore–Penrose pseudo-inverse `A⁺ = V Σ⁺ Uᵗ`, of shape `cols x rows`.
    /// Singular values at or below `SINGULAR_VALUE_TOLERANCE` are zeroed out, instead of being inverted.
    pub fn pseudo_inverse(&self) -> Result<Matrix, BPIRError> {
        let Svd { u, sigma, v } = self.svd()?;

        let inv_sigma = sigma
            .iter()
            .map(|&s| if s > SINGULAR_VALUE_TOLERANCE { 1.0 / s } else { 0.0 })
            .collect::<Vec<f64>>();

        let res_num_rows = self.cols;
        let res_num_cols = self.rows;
        let mut res_elems = vec![0.0; res_num_rows * res_num_cols];

        res_elems.par_iter_mut().enumerate().for_each(|(lin_idx, res_elem)| {
            let r_idx = lin_idx / res_num_cols;
            let c_idx = lin_idx % res_num_cols;

            *res_elem = inv_sigma
                .iter()
                .enumerate()
                .filter(|&(_, &inv)| inv != 0.0)
                .map(|(k, &inv)| v[(r_idx, k)] * inv * u[(c_idx, k)])
                .sum();
        });

        Matrix::from_values(res_num_rows, res_num_cols, res_elems)
    }

    /// Solves the square linear system `self · x = rhs` using Gaussian elimination with partial pivoting.
    ///
    /// Returns `SingularLinearSystem` if some pivot is negligible relative to the largest entry of `self`.
    pub fn solve(&self, rhs: &[f64]) -> Result<Vec<f64>, BPIRError> {
        if branch_opt_util::unlikely(self.rows != self.cols) {
            return Err(BPIRError::NonSquareMatrix(self.rows, self.cols));
        }
        if branch_opt_util::unlikely(rhs.len() != self.rows) {
            return Err(BPIRError::IncompatibleDimensionForMatrixVectorMultiplication);
        }

        let n = self.rows;
        let mut a = self.elems.clone();
        let mut b = rhs.to_vec();

        let scale = a.iter().fold(0.0f64, |acc, &x| acc.max(x.abs()));
        if branch_opt_util::unlikely(!scale.is_finite()) {
            return Err(BPIRError::NonFiniteValue);
        }
        let pivot_threshold = PIVOT_TOLERANCE * scale;

        for col in 0..n {
            let pivot_row = (col..n).max_by(|&i, &j| a[i * n + col].abs().total_cmp(&a[j * n + col].abs())).unwrap_or(col);

            if branch_opt_util::unlikely(a[pivot_row * n + col].abs() <= pivot_threshold) {
                return Err(BPIRError::SingularLinearSystem);
            }

            if pivot_row != col {
                (0..n).for_each(|k| a.swap(col * n + k, pivot_row * n + k));
                b.swap(col, pivot_row);
            }

            let pivot = a[col * n + col];
            for row in (col + 1)..n {
                let factor = a[row * n + col] / pivot;
                if factor == 0.0 {
                    continue;
                }

                for k in col..n {
                    a[row * n + k] -= factor * a[col * n + k];
                }
                b[row] -= factor * b[col];
            }
        }

        let mut x = vec![0.0; n];
        for row in (0..n).rev() {
            let acc = ((row + 1)..n).fold(b[row], |acc, k| acc - a[row * n + k] * x[k]);
            x[row] = acc / a[row * n + row];
        }

        Ok(x)
    }

    /// Rejection samples a `rows x cols` matrix with integer entries in [1, ENCODING_MATRIX_MAX_ENTRY], until it has full rank.
    /// Random entries almost surely give full rank, so the loop is not bounded.
    pub fn sample_full_rank<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Result<Matrix, BPIRError> {
        let expected_rank = rows.min(cols);

        loop {
            let elems = (0..rows * cols)
                .map(|_| rng.random_range(1..=ENCODING_MATRIX_MAX_ENTRY) as f64)
                .collect::<Vec<f64>>();
            let mat = Matrix::from_values(rows, cols, elems)?;

            if branch_opt_util::likely(mat.rank()? == expected_rank) {
                return Ok(mat);
            }
        }
    }

    /// Builds the square generalized Vandermonde matrix `B[i][j] = seeds[i]^j`.
    ///
    /// With distinct, positive seeds, every square submatrix, formed by picking any `k` rows and any `k` columns, is non-singular.
    pub fn generalized_vandermonde(seeds: &[f64]) -> Result<Matrix, BPIRError> {
        let n = seeds.len();
        if branch_opt_util::unlikely(n == 0) {
            return Err(BPIRError::InvalidMatrixDimension);
        }
        if branch_opt_util::unlikely(seeds.iter().any(|&s| !(s.is_finite() && s > 0.0))) {
            return Err(BPIRError::CheckMatrixSeedsNotDistinct);
        }

        let mut sorted = seeds.to_vec();
        sorted.sort_by(f64::total_cmp);
        if branch_opt_util::unlikely(sorted.windows(2).any(|w| w[0] == w[1])) {
            return Err(BPIRError::CheckMatrixSeedsNotDistinct);
        }

        let elems = seeds.iter().flat_map(|&seed| (0..n).map(move |j| seed.powi(j as i32))).collect::<Vec<f64>>();
        Matrix::from_values(n, n, elems)
    }

    /// Samples `n` distinct seeds from [1, CHECK_MATRIX_SEED_SPREAD * n], sorts them ascending and builds the `n x n` check matrix.
    ///
    /// Ascending order keeps the leading rows, which reconstruction uses, the smallest in magnitude.
    pub fn sample_check_matrix<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Result<Matrix, BPIRError> {
        if branch_opt_util::unlikely(n == 0) {
            return Err(BPIRError::InvalidMatrixDimension);
        }

        let mut seeds = rand::seq::index::sample(rng, CHECK_MATRIX_SEED_SPREAD * n, n)
            .into_iter()
            .map(|idx| (idx + 1) as f64)
            .collect::<Vec<f64>>();
        seeds.sort_by(f64::total_cmp);

        Matrix::generalized_vandermonde(&seeds)
    }

    /// One-sided Jacobi (Hestenes) SVD, for matrices with at least as many rows as columns.
    fn one_sided_jacobi(&self) -> Result<Svd, BPIRError> {
        let (m, n) = (self.rows, self.cols);

        let mut u = self.clone();
        let mut v = Matrix::identity(n)?;

        let mut converged = false;
        for _ in 0..SVD_MAX_SWEEPS {
            let mut rotated = false;

            for p in 0..n.saturating_sub(1) {
                for q in (p + 1)..n {
                    let (alpha, beta, gamma) = (0..m).fold((0.0, 0.0, 0.0), |(alpha, beta, gamma), i| {
                        let (up, uq) = (u[(i, p)], u[(i, q)]);
                        (alpha + up * up, beta + uq * uq, gamma + up * uq)
                    });

                    if gamma == 0.0 || gamma.abs() <= SVD_ORTHOGONALITY_TOLERANCE * (alpha * beta).sqrt() {
                        continue;
                    }
                    rotated = true;

                    let zeta = (beta - alpha) / (2.0 * gamma);
                    let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                    let c = 1.0 / (1.0 + t * t).sqrt();
                    let s = c * t;

                    u.rotate_cols(p, q, c, s);
                    v.rotate_cols(p, q, c, s);
                }
            }

            if !rotated {
                converged = true;
                break;
            }
        }

        if branch_opt_util::unlikely(!converged) {
            return Err(BPIRError::SvdDidNotConverge(SVD_MAX_SWEEPS));
        }

        let sigma = (0..n)
            .map(|j| {
                let norm = (0..m).map(|i| u[(i, j)] * u[(i, j)]).sum::<f64>().sqrt();
                if norm > SINGULAR_VALUE_TOLERANCE {
                    (0..m).for_each(|i| u[(i, j)] /= norm);
                }
                norm
            })
            .collect::<Vec<f64>>();

        Ok(Svd { u, sigma, v })
    }

    fn rotate_cols(&mut self, p: usize, q: usize, c: f64, s: f64) {
        (0..self.rows).for_each(|i| {
            let (xp, xq) = (self[(i, p)], self[(i, q)]);
            self[(i, p)] = c * xp - s * xq;
            self[(i, q)] = s * xp + c * xq;
        });
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        let (ridx, cidx) = index;
        &self.elems[ridx * self.cols + cidx]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        let (ridx, cidx) = index;
        &mut self.elems[ridx * self.cols + cidx]
    }
}

impl<'b> Mul<&'b Matrix> for &Matrix {
    type Output = Result<Matrix, BPIRError>;

    fn mul(self, rhs: &'b Matrix) -> Self::Output {
        if branch_opt_util::unlikely(self.cols != rhs.rows) {
            return Err(BPIRError::IncompatibleDimensionForMatrixMultiplication);
        }

        let res_num_rows = self.rows;
        let res_num_cols = rhs.cols;

        let mut res_elems = vec![0.0; res_num_rows * res_num_cols];

        res_elems.par_iter_mut().enumerate().for_each(|(lin_idx, v)| {
            let r_idx = lin_idx / res_num_cols;
            let c_idx = lin_idx % res_num_cols;

            *v = (0..self.cols).map(|k| self[(r_idx, k)] * rhs[(k, c_idx)]).sum();
        });

        Matrix::from_values(res_num_rows, res_num_cols, res_elems)
    }
}
