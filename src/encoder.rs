use crate::{
    BPIRError,
    client::Client,
    config::Config,
    pir_internals::{
        branch_opt_util,
        commitment::CommitmentTable,
        conversion,
        int_matrix::IntMatrix,
        matrix::Matrix,
    },
    server::Server,
};
use num_bigint::{BigInt, Sign};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Raw record database `X`, an `l x m` matrix of non-negative integers, s.t. column `j` holds the `l` blocks of record `j`.
#[derive(Clone, Debug)]
pub struct RecordDatabase {
    records: IntMatrix,
}

impl RecordDatabase {
    /// Fills an `l x m` database with independent uniform random integers of `elem_byte_len` bytes each.
    /// Randomness comes from ChaCha8, seeded by the OS entropy source.
    pub fn generate(record_len: usize, num_records: usize, elem_byte_len: usize) -> Result<RecordDatabase, BPIRError> {
        if branch_opt_util::unlikely(elem_byte_len == 0) {
            return Err(BPIRError::InvalidConfigValue("num_bytes".to_string(), elem_byte_len.to_string()));
        }

        let mut rng = seeded_rng()?;
        let mut elem_bytes = vec![0u8; elem_byte_len];

        let elems = (0..record_len * num_records)
            .map(|_| {
                rng.fill_bytes(&mut elem_bytes);
                BigInt::from_bytes_le(Sign::Plus, &elem_bytes)
            })
            .collect::<Vec<BigInt>>();

        Ok(RecordDatabase {
            records: IntMatrix::from_values(record_len, num_records, elems)?,
        })
    }

    /// Builds the database out of `m` records, each being `l` blocks long.
    pub fn from_records(records: &[Vec<BigInt>]) -> Result<RecordDatabase, BPIRError> {
        let num_records = records.len();
        let record_len = records.first().map_or(0, Vec::len);

        if branch_opt_util::unlikely(records.iter().any(|record| record.len() != record_len)) {
            return Err(BPIRError::InvalidNumberOfElementsInMatrix);
        }

        let elems = (0..record_len)
            .flat_map(|block_idx| records.iter().map(move |record| record[block_idx].clone()))
            .collect::<Vec<BigInt>>();

        Ok(RecordDatabase {
            records: IntMatrix::from_values(record_len, num_records, elems)?,
        })
    }

    #[inline(always)]
    pub fn num_records(&self) -> usize {
        self.records.num_cols()
    }

    #[inline(always)]
    pub fn record_len(&self) -> usize {
        self.records.num_rows()
    }

    pub fn record(&self, index: usize) -> Result<Vec<BigInt>, BPIRError> {
        self.records
            .column(index)
            .map_err(|_| BPIRError::TargetIndexOutOfRange(index, self.num_records()))
    }
}

/// Everything the setup phase produces. Immutable once built, so it can be shared by concurrent retrievals without locking.
///
/// * `V`, the `n x l` full-rank encoding matrix, and its `l x n` pseudo-inverse `V⁺`.
/// * `Y = V·X`, the `n x m` share table, computed exactly.
/// * `B`, the `n x n` check matrix, each square submatrix of which is non-singular.
/// * `S = B·Y`, the `n x m` verification table.
/// * `H`, commitments to each entry of `Y`.
#[derive(Debug)]
pub struct Encoding {
    encoding_pinv: Matrix,
    shares: IntMatrix,
    check_mat: Matrix,
    verification_table: Matrix,
    commitments: CommitmentTable,
}

impl Encoding {
    /// Runs the setup phase for `num_servers` servers over database `db`.
    ///
    /// Requires `l ≤ num_servers`. `V` then has full column rank, so `V⁺·V = I` and every record decodes exactly.
    pub fn new(num_servers: usize, db: &RecordDatabase) -> Result<Encoding, BPIRError> {
        let record_len = db.record_len();

        if branch_opt_util::unlikely(num_servers == 0) {
            return Err(BPIRError::InvalidMatrixDimension);
        }
        if branch_opt_util::unlikely(record_len > num_servers) {
            return Err(BPIRError::RecordLengthExceedsServerCount(record_len, num_servers));
        }

        let mut rng = seeded_rng()?;

        let encoding_mat = Matrix::sample_full_rank(num_servers, record_len, &mut rng)?;
        let encoding_pinv = encoding_mat.pseudo_inverse()?;
        let shares = encode(&encoding_mat, &db.records)?;

        let check_mat = Matrix::sample_check_matrix(num_servers, &mut rng)?;
        let verification_table = compute_verification_table(&check_mat, &shares)?;
        let commitments = CommitmentTable::from_shares(&shares);

        debug!(num_servers, record_len, num_records = db.num_records(), "encoded record database");

        Ok(Encoding {
            encoding_pinv,
            shares,
            check_mat,
            verification_table,
            commitments,
        })
    }

    #[inline(always)]
    pub fn num_servers(&self) -> usize {
        self.shares.num_rows()
    }

    #[inline(always)]
    pub fn num_records(&self) -> usize {
        self.shares.num_cols()
    }

    /// Hands row `i` of the share table to server `i`. Each server owns a copy of its row.
    pub fn distribute(&self) -> Result<Vec<Server>, BPIRError> {
        (0..self.num_servers())
            .map(|idx| Server::new(idx, self.shares.row(idx)?.to_vec()))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn shares(&self) -> &IntMatrix {
        &self.shares
    }

    pub(crate) fn encoding_pinv(&self) -> &Matrix {
        &self.encoding_pinv
    }

    pub(crate) fn check_mat(&self) -> &Matrix {
        &self.check_mat
    }

    pub(crate) fn verification_table(&self) -> &Matrix {
        &self.verification_table
    }

    pub(crate) fn commitments(&self) -> &CommitmentTable {
        &self.commitments
    }
}

/// Runs setup for the given configuration and database, returning the `n` servers, in index order, and the client.
pub fn setup(config: &Config, db: &RecordDatabase) -> Result<(Vec<Server>, Client), BPIRError> {
    config.validate()?;

    if branch_opt_util::unlikely(db.record_len() != config.record_len || db.num_records() != config.num_records) {
        return Err(BPIRError::DatabaseShapeMismatch(
            (config.record_len, config.num_records),
            (db.record_len(), db.num_records()),
        ));
    }

    let encoding = Encoding::new(config.num_servers, db)?;
    let servers = encoding.distribute()?;
    let client = Client::setup(&encoding, config.blinding_a, config.blinding_b)?;

    Ok((servers, client))
}

/// Computes `Y = V·X` exactly. Entries of `V` are integral by construction, so they convert losslessly.
fn encode(encoding_mat: &Matrix, records: &IntMatrix) -> Result<IntMatrix, BPIRError> {
    let encoding_mat = conversion::float_matrix_to_int(encoding_mat)?;
    &encoding_mat * records
}

fn compute_verification_table(check_mat: &Matrix, shares: &IntMatrix) -> Result<Matrix, BPIRError> {
    let shares = conversion::int_matrix_to_float(shares)?;
    check_mat * &shares
}

fn seeded_rng() -> Result<ChaCha8Rng, BPIRError> {
    ChaCha8Rng::try_from_os_rng().map_err(|e| BPIRError::EntropySourceExhausted(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::{Encoding, RecordDatabase};
    use crate::{
        BPIRError,
        pir_internals::{commitment::Commitment, conversion},
    };
    use num_bigint::BigInt;
    use test_case::test_case;

    #[test]
    fn generated_database_respects_element_byte_length() {
        const ELEM_BYTE_LEN: usize = 2;

        let db = RecordDatabase::generate(3, 16, ELEM_BYTE_LEN).unwrap();
        assert_eq!((db.record_len(), db.num_records()), (3, 16));

        let upper_bound = BigInt::from(1u32 << (8 * ELEM_BYTE_LEN));
        for idx in 0..db.num_records() {
            assert!(db.record(idx).unwrap().iter().all(|v| *v >= BigInt::from(0) && *v < upper_bound));
        }
    }

    #[test]
    fn database_built_from_records_returns_them_back() {
        let records = (0..4).map(|j| (0..3).map(|i| BigInt::from(10 * j + i)).collect::<Vec<BigInt>>()).collect::<Vec<_>>();
        let db = RecordDatabase::from_records(&records).unwrap();

        assert_eq!(db.record(2).unwrap(), records[2]);
        assert_eq!(db.record(4), Err(BPIRError::TargetIndexOutOfRange(4, 4)));
        assert!(RecordDatabase::from_records(&[vec![BigInt::from(1)], vec![]]).is_err());
    }

    #[test_case(3, 3 => matches Ok(_); "As many servers as record blocks is valid")]
    #[test_case(5, 2 => matches Ok(_); "More servers than record blocks is valid")]
    #[test_case(5, 6 => matches Err(BPIRError::RecordLengthExceedsServerCount(6, 5)); "Fewer servers than record blocks is rejected")]
    #[test_case(0, 5 => matches Err(BPIRError::InvalidMatrixDimension); "At least one server is required")]
    fn encoding_preconditions(num_servers: usize, record_len: usize) -> Result<Encoding, BPIRError> {
        let db = RecordDatabase::generate(record_len, 4, 2)?;
        Encoding::new(num_servers, &db)
    }

    #[test]
    fn encoding_artifacts_are_consistent() {
        const NUM_SERVERS: usize = 6;
        const RECORD_LEN: usize = 4;
        const NUM_RECORDS: usize = 8;

        let db = RecordDatabase::generate(RECORD_LEN, NUM_RECORDS, 2).unwrap();
        let encoding = Encoding::new(NUM_SERVERS, &db).unwrap();

        let servers = encoding.distribute().unwrap();
        assert_eq!(servers.len(), NUM_SERVERS);
        servers.iter().enumerate().for_each(|(idx, server)| {
            assert_eq!(server.index(), idx);
            assert_eq!(server.num_records(), NUM_RECORDS);
        });

        for record_idx in 0..NUM_RECORDS {
            let share_col = encoding.shares().column(record_idx).unwrap();

            let commitments = encoding.commitments().column(record_idx).unwrap();
            assert!(commitments.iter().zip(&share_col).all(|(c, v)| *c == Commitment::commit(v)));

            let share_col_f = conversion::int_vec_to_float(&share_col).unwrap();
            let expected_verification = encoding.check_mat().mul_vec(&share_col_f).unwrap();
            assert_eq!(encoding.verification_table().column(record_idx).unwrap(), expected_verification);

            let decoded = conversion::float_vec_to_int(&encoding.encoding_pinv().mul_vec(&share_col_f).unwrap()).unwrap();
            assert_eq!(decoded, db.record(record_idx).unwrap());
        }
    }
}
