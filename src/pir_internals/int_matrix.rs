use super::{branch_opt_util, error::BPIRError};
use num_bigint::BigInt;
use num_traits::Zero;
use rayon::prelude::*;
use std::ops::{Index, Mul};

/// Dense, row-major matrix of arbitrary-precision integers. Holds the raw record database and the encoded share table,
/// which must stay exact since servers answer queries over them and commitments are computed on them.
#[derive(Clone, Debug, PartialEq)]
pub struct IntMatrix {
    rows: usize,
    cols: usize,
    elems: Vec<BigInt>,
}

impl IntMatrix {
    pub fn from_values(rows: usize, cols: usize, values: Vec<BigInt>) -> Result<IntMatrix, BPIRError> {
        if branch_opt_util::likely((rows > 0) && (cols > 0)) {
            if branch_opt_util::likely(rows * cols == values.len()) {
                Ok(IntMatrix { rows, cols, elems: values })
            } else {
                Err(BPIRError::InvalidNumberOfElementsInMatrix)
            }
        } else {
            Err(BPIRError::InvalidMatrixDimension)
        }
    }

    #[inline(always)]
    pub const fn num_rows(&self) -> usize {
        self.rows
    }
    #[inline(always)]
    pub const fn num_cols(&self) -> usize {
        self.cols
    }

    pub fn elems(&self) -> &[BigInt] {
        &self.elems
    }

    pub fn row(&self, ridx: usize) -> Result<&[BigInt], BPIRError> {
        if branch_opt_util::unlikely(ridx >= self.rows) {
            return Err(BPIRError::MatrixIndexOutOfRange(ridx, self.rows));
        }

        Ok(&self.elems[ridx * self.cols..(ridx + 1) * self.cols])
    }

    pub fn column(&self, cidx: usize) -> Result<Vec<BigInt>, BPIRError> {
        if branch_opt_util::unlikely(cidx >= self.cols) {
            return Err(BPIRError::MatrixIndexOutOfRange(cidx, self.cols));
        }

        Ok((0..self.rows).map(|ridx| self[(ridx, cidx)].clone()).collect())
    }
}

impl Index<(usize, usize)> for IntMatrix {
    type Output = BigInt;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        let (ridx, cidx) = index;
        &self.elems[ridx * self.cols + cidx]
    }
}

impl<'b> Mul<&'b IntMatrix> for &IntMatrix {
    type Output = Result<IntMatrix, BPIRError>;

    fn mul(self, rhs: &'b IntMatrix) -> Self::Output {
        if branch_opt_util::unlikely(self.cols != rhs.rows) {
            return Err(BPIRError::IncompatibleDimensionForMatrixMultiplication);
        }

        let res_num_rows = self.rows;
        let res_num_cols = rhs.cols;

        let mut res_elems = vec![BigInt::zero(); res_num_rows * res_num_cols];

        res_elems.par_iter_mut().enumerate().for_each(|(lin_idx, v)| {
            let r_idx = lin_idx / res_num_cols;
            let c_idx = lin_idx % res_num_cols;

            *v = (0..self.cols).fold(BigInt::zero(), |acc, k| acc + &self[(r_idx, k)] * &rhs[(k, c_idx)]);
        });

        IntMatrix::from_values(res_num_rows, res_num_cols, res_elems)
    }
}
