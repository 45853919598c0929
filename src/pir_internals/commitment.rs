use super::{branch_opt_util, error::BPIRError, int_matrix::IntMatrix, params::COMMITMENT_BYTE_LEN};
use num_bigint::BigInt;
use rayon::prelude::*;
use turboshake::TurboShake128;

/// TurboSHAKE128 digest of an integer's two's-complement little-endian encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Commitment([u8; COMMITMENT_BYTE_LEN]);

impl Commitment {
    pub fn commit(value: &BigInt) -> Commitment {
        let mut hasher = TurboShake128::default();
        hasher.absorb(&value.to_signed_bytes_le());
        hasher.finalize::<{ TurboShake128::DEFAULT_DOMAIN_SEPARATOR }>();

        let mut digest = [0u8; COMMITMENT_BYTE_LEN];
        hasher.squeeze(&mut digest);

        Commitment(digest)
    }

    pub fn matches(&self, value: &BigInt) -> bool {
        *self == Commitment::commit(value)
    }
}

/// `H[i][j] = hash(Y[i][j])`, one commitment per encoded share.
#[derive(Clone, Debug)]
pub struct CommitmentTable {
    rows: usize,
    cols: usize,
    elems: Vec<Commitment>,
}

impl CommitmentTable {
    pub fn from_shares(shares: &IntMatrix) -> CommitmentTable {
        let elems = shares.elems().par_iter().map(Commitment::commit).collect();

        CommitmentTable {
            rows: shares.num_rows(),
            cols: shares.num_cols(),
            elems,
        }
    }

    pub fn column(&self, cidx: usize) -> Result<Vec<Commitment>, BPIRError> {
        if branch_opt_util::unlikely(cidx >= self.cols) {
            return Err(BPIRError::MatrixIndexOutOfRange(cidx, self.cols));
        }

        Ok((0..self.rows).map(|ridx| self.elems[ridx * self.cols + cidx]).collect())
    }
}

#[cfg(test)]
mod test {
    use super::{Commitment, CommitmentTable};
    use crate::pir_internals::int_matrix::IntMatrix;
    use num_bigint::BigInt;

    #[test]
    fn commitment_binds_to_value() {
        let value = BigInt::from(1_234_567u64);
        let commitment = Commitment::commit(&value);

        assert!(commitment.matches(&value));
        assert!(!commitment.matches(&(&value + 1)));
        assert!(!commitment.matches(&-value));
    }

    #[test]
    fn commitment_table_column_follows_share_column() {
        let shares = IntMatrix::from_values(2, 3, (10..16).map(BigInt::from).collect()).unwrap();
        let table = CommitmentTable::from_shares(&shares);

        let column = table.column(1).unwrap();
        assert_eq!(column, vec![Commitment::commit(&BigInt::from(11)), Commitment::commit(&BigInt::from(14))]);
        assert!(table.column(3).is_err());
    }
}
