use crate::{
    BPIRError,
    encoder::Encoding,
    pir_internals::{
        branch_opt_util,
        commitment::CommitmentTable,
        conversion,
        matrix::Matrix,
        params::FAULT_SENTINEL,
        query::{Query, Response},
        reconstruct,
    },
    server::Server,
};
use num_bigint::BigInt;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Outcome of checking raw answers against their commitments. Both sets are in ascending server index order and together
/// they partition `0..n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub dishonest: Vec<usize>,
    pub honest: Vec<usize>,
}

/// A decoded record, together with the servers which were caught lying while retrieving it.
#[derive(Clone, Debug, PartialEq)]
pub struct Retrieval {
    pub record: Vec<BigInt>,
    pub dishonest: Vec<usize>,
}

/// Client of the Byzantine-robust PIR scheme. Holds the public decoding state produced at setup and the blinding scalars.
///
/// Nothing in here is mutated after setup, so one client can drive many retrievals, from many threads.
#[derive(Clone, Debug)]
pub struct Client {
    blinding_a: BigInt,
    blinding_b: BigInt,
    encoding_pinv: Matrix,
    check_mat: Matrix,
    verification_table: Matrix,
    commitments: CommitmentTable,
}

impl Client {
    /// Sets up a client from the encoder's output and two non-zero blinding scalars.
    ///
    /// Queries built with the same `(a, b)` are linkable by a server looking at gcd of its query entries, pick fresh scalars
    /// per retrieval if that matters.
    pub fn setup(encoding: &Encoding, blinding_a: i64, blinding_b: i64) -> Result<Client, BPIRError> {
        if branch_opt_util::unlikely(blinding_a == 0 || blinding_b == 0) {
            return Err(BPIRError::ZeroBlindingScalar);
        }

        Ok(Client {
            blinding_a: BigInt::from(blinding_a),
            blinding_b: BigInt::from(blinding_b),
            encoding_pinv: encoding.encoding_pinv().clone(),
            check_mat: encoding.check_mat().clone(),
            verification_table: encoding.verification_table().clone(),
            commitments: encoding.commitments().clone(),
        })
    }

    #[inline(always)]
    pub fn num_servers(&self) -> usize {
        self.check_mat.num_rows()
    }

    #[inline(always)]
    pub fn num_records(&self) -> usize {
        self.verification_table.num_cols()
    }

    #[inline(always)]
    pub fn record_len(&self) -> usize {
        self.encoding_pinv.num_rows()
    }

    /// Generates `n` independent blinded queries for record `target_index`, the `i`-th one to be sent to server `i`.
    /// Each query gets its own blinding vector.
    pub fn query(&self, target_index: usize) -> Result<Vec<Query>, BPIRError> {
        if branch_opt_util::unlikely(target_index >= self.num_records()) {
            return Err(BPIRError::TargetIndexOutOfRange(target_index, self.num_records()));
        }

        (0..self.num_servers())
            .into_par_iter()
            .map(|_| {
                let mut rng = rand::rng();
                Query::generate(&self.blinding_a, &self.blinding_b, self.num_records(), target_index, &mut rng)
            })
            .collect()
    }

    /// Turns `n` responses, indexed by server, into raw answers `(a2 - a1) / b`.
    pub fn combine_responses(&self, responses: &[Response]) -> Result<Vec<BigInt>, BPIRError> {
        if branch_opt_util::unlikely(responses.len() != self.num_servers()) {
            return Err(BPIRError::UnexpectedResponseCount(self.num_servers(), responses.len()));
        }

        responses
            .iter()
            .enumerate()
            .map(|(server, response)| response.combine(&self.blinding_b, server))
            .collect()
    }

    /// Marks server `i` dishonest iff `hash(raw[i]) ≠ H[i][target_index]`.
    pub fn verify(&self, target_index: usize, raw: &[BigInt]) -> Result<Verdict, BPIRError> {
        if branch_opt_util::unlikely(raw.len() != self.num_servers()) {
            return Err(BPIRError::UnexpectedResponseCount(self.num_servers(), raw.len()));
        }
        if branch_opt_util::unlikely(target_index >= self.num_records()) {
            return Err(BPIRError::TargetIndexOutOfRange(target_index, self.num_records()));
        }

        let commitments = self.commitments.column(target_index)?;
        let (honest, dishonest): (Vec<usize>, Vec<usize>) = (0..raw.len()).partition(|&idx| commitments[idx].matches(&raw[idx]));

        if !dishonest.is_empty() {
            warn!(?dishonest, target_index, "responses failed commitment check");
        }

        Ok(Verdict { dishonest, honest })
    }

    /// Replaces answers of dishonest servers with the values they should have returned, leaving honest answers untouched.
    ///
    /// Only honest answers are fed into floating point, so whatever a dishonest server returned can't poison the solve.
    /// Each recovered value is checked against its commitment; a mismatch means precision was lost and is reported as
    /// `ReconstructionMismatch`, never decoded.
    pub fn reconstruct(&self, target_index: usize, raw: &[BigInt], verdict: &Verdict) -> Result<Vec<BigInt>, BPIRError> {
        let n = self.num_servers();

        if branch_opt_util::unlikely(raw.len() != n) {
            return Err(BPIRError::UnexpectedResponseCount(n, raw.len()));
        }
        if verdict.dishonest.is_empty() {
            return Ok(raw.to_vec());
        }

        let verification_col = self.verification_table.column(target_index)?;

        let mut raw_f = vec![0.0; n];
        for &idx in &verdict.honest {
            let value = raw.get(idx).ok_or(BPIRError::InvalidServerIndex(idx))?;
            raw_f[idx] = conversion::int_to_float(value)?;
        }

        let recovered = reconstruct::reconstruct(&self.check_mat, &verification_col, &raw_f, &verdict.dishonest, &verdict.honest)?;
        let commitments = self.commitments.column(target_index)?;

        let mut corrected = raw.to_vec();
        for (&idx, &value) in verdict.dishonest.iter().zip(&recovered) {
            let value = conversion::float_to_int(value)?;
            if branch_opt_util::unlikely(!commitments[idx].matches(&value)) {
                return Err(BPIRError::ReconstructionMismatch(idx));
            }

            corrected[idx] = value;
        }

        debug!(dishonest = ?verdict.dishonest, "reconstructed dishonest answers");
        Ok(corrected)
    }

    /// Maps `n` corrected shares of one record back to its `l` blocks, as `round(V⁺·y)`.
    pub fn decode(&self, shares: &[BigInt]) -> Result<Vec<BigInt>, BPIRError> {
        if branch_opt_util::unlikely(shares.len() != self.num_servers()) {
            return Err(BPIRError::UnexpectedResponseCount(self.num_servers(), shares.len()));
        }

        let shares = conversion::int_vec_to_float(shares)?;
        let record = self.encoding_pinv.mul_vec(&shares)?;

        conversion::float_vec_to_int(&record)
    }

    /// Verifies raw answers, reconstructs what dishonest servers withheld and decodes the target record.
    pub fn recover_record(&self, target_index: usize, raw: &[BigInt]) -> Result<Retrieval, BPIRError> {
        let verdict = self.verify(target_index, raw)?;
        let corrected = self.reconstruct(target_index, raw, &verdict)?;
        let record = self.decode(&corrected)?;

        Ok(Retrieval {
            record,
            dishonest: verdict.dishonest,
        })
    }

    pub fn process_responses(&self, target_index: usize, responses: &[Response]) -> Result<Retrieval, BPIRError> {
        let raw = self.combine_responses(responses)?;
        self.recover_record(target_index, &raw)
    }

    /// Runs one full retrieval round against in-process servers: queries go out concurrently, and processing starts only
    /// after all `n` responses are in.
    ///
    /// # Arguments
    ///
    /// * `servers` - All `n` servers, server `i` at position `i`.
    /// * `target_index` - Record to retrieve.
    /// * `simulated_dishonest` - Servers whose raw answer gets overwritten by a fault, for exercising recovery.
    pub fn retrieve(&self, servers: &[Server], target_index: usize, simulated_dishonest: &[usize]) -> Result<Retrieval, BPIRError> {
        if branch_opt_util::unlikely(servers.len() != self.num_servers()) {
            return Err(BPIRError::UnexpectedResponseCount(self.num_servers(), servers.len()));
        }
        if let Some((_, server)) = servers.iter().enumerate().find(|(idx, server)| server.index() != *idx) {
            return Err(BPIRError::InvalidServerIndex(server.index()));
        }

        let queries = self.query(target_index)?;
        let responses = servers
            .par_iter()
            .zip(queries.par_iter())
            .map(|(server, query)| server.respond(query))
            .collect::<Result<Vec<Response>, BPIRError>>()?;

        let mut raw = self.combine_responses(&responses)?;
        inject_fault(simulated_dishonest, &mut raw)?;

        self.recover_record(target_index, &raw)
    }
}

/// Overwrites raw answers of the given servers with a value no honest server can produce, simulating Byzantine behaviour.
/// Shares are non-negative, so the negative sentinel never matches a commitment.
pub fn inject_fault(dishonest: &[usize], raw: &mut [BigInt]) -> Result<(), BPIRError> {
    if branch_opt_util::unlikely(dishonest.len() > raw.len()) {
        return Err(BPIRError::TooManyDishonestServers(dishonest.len(), raw.len()));
    }

    for &idx in dishonest {
        let value = raw.get_mut(idx).ok_or(BPIRError::InvalidServerIndex(idx))?;
        *value = BigInt::from(FAULT_SENTINEL);
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::{Client, Verdict, inject_fault};
    use crate::{
        BPIRError,
        encoder::{Encoding, RecordDatabase},
        pir_internals::query::Response,
    };
    use num_bigint::BigInt;
    use test_case::test_case;

    const NUM_SERVERS: usize = 4;
    const RECORD_LEN: usize = 3;
    const NUM_RECORDS: usize = 6;

    fn setup() -> (RecordDatabase, Encoding, Client) {
        let db = RecordDatabase::generate(RECORD_LEN, NUM_RECORDS, 2).unwrap();
        let encoding = Encoding::new(NUM_SERVERS, &db).unwrap();
        let client = Client::setup(&encoding, 7, 13).unwrap();

        (db, encoding, client)
    }

    fn honest_raw(encoding: &Encoding, target_index: usize) -> Vec<BigInt> {
        encoding.shares().column(target_index).unwrap()
    }

    #[test]
    fn client_setup_rejects_zero_blinding_scalar() {
        let (_, encoding, client) = setup();

        assert_eq!((client.num_servers(), client.num_records(), client.record_len()), (NUM_SERVERS, NUM_RECORDS, RECORD_LEN));
        assert!(matches!(Client::setup(&encoding, 0, 3), Err(BPIRError::ZeroBlindingScalar)));
        assert!(matches!(Client::setup(&encoding, 3, 0), Err(BPIRError::ZeroBlindingScalar)));
    }

    #[test]
    fn one_independent_query_per_server() {
        let (_, _, client) = setup();

        let queries = client.query(NUM_RECORDS - 1).unwrap();
        assert_eq!(queries.len(), NUM_SERVERS);
        assert!(queries.iter().all(|query| query.num_records() == NUM_RECORDS));

        assert!(matches!(client.query(NUM_RECORDS), Err(BPIRError::TargetIndexOutOfRange(NUM_RECORDS, NUM_RECORDS))));
    }

    #[test_case(vec![] => Vec::<usize>::new(); "Untouched answers are all honest")]
    #[test_case(vec![2] => vec![2]; "Single fault is caught")]
    #[test_case(vec![3, 0] => vec![0, 3]; "Faults are reported in ascending order")]
    #[test_case(vec![0, 1, 2, 3] => vec![0, 1, 2, 3]; "Every server can be caught")]
    fn verification_flags_exactly_the_faulty_servers(faulty: Vec<usize>) -> Vec<usize> {
        let (_, encoding, client) = setup();

        let mut raw = honest_raw(&encoding, 1);
        inject_fault(&faulty, &mut raw).unwrap();

        let verdict = client.verify(1, &raw).unwrap();

        let mut covered = verdict.dishonest.iter().chain(&verdict.honest).copied().collect::<Vec<usize>>();
        covered.sort_unstable();
        assert_eq!(covered, (0..NUM_SERVERS).collect::<Vec<usize>>());

        verdict.dishonest
    }

    #[test]
    fn reconstruction_restores_honest_shares() {
        let (_, encoding, client) = setup();

        for target_index in 0..NUM_RECORDS {
            let expected = honest_raw(&encoding, target_index);

            let mut raw = expected.clone();
            inject_fault(&[1, 3], &mut raw).unwrap();
            raw[3] = BigInt::from(1u8) << 4096;

            let verdict = client.verify(target_index, &raw).unwrap();
            assert_eq!(verdict, Verdict { dishonest: vec![1, 3], honest: vec![0, 2] });

            assert_eq!(client.reconstruct(target_index, &raw, &verdict).unwrap(), expected);
        }
    }

    #[test]
    fn reconstruction_disagreeing_with_commitment_is_rejected() {
        let (_, encoding, mut client) = setup();
        let target_index = 2;

        let mut raw = honest_raw(&encoding, target_index);
        inject_fault(&[1, 3], &mut raw).unwrap();
        let verdict = client.verify(target_index, &raw).unwrap();

        client.verification_table[(0, target_index)] += 1.0e9;

        let res = client.reconstruct(target_index, &raw, &verdict);
        assert!(matches!(res, Err(BPIRError::ReconstructionMismatch(1 | 3))));
        assert_eq!(res.unwrap_err().kind(), crate::ErrorKind::Numerical);
    }

    #[test]
    fn decoding_honest_shares_yields_record() {
        let (db, encoding, client) = setup();

        for target_index in 0..NUM_RECORDS {
            let shares = honest_raw(&encoding, target_index);
            assert_eq!(client.decode(&shares).unwrap(), db.record(target_index).unwrap());
        }

        assert!(matches!(client.decode(&[BigInt::from(1)]), Err(BPIRError::UnexpectedResponseCount(NUM_SERVERS, 1))));
    }

    #[test]
    fn tampered_response_is_reported_with_server_index() {
        let (_, _, client) = setup();

        let mut responses = vec![
            Response {
                a1: BigInt::from(0),
                a2: BigInt::from(13),
            };
            NUM_SERVERS
        ];
        responses[2].a2 += 1;

        assert_eq!(client.combine_responses(&responses), Err(BPIRError::NonExactResponseDivision(2)));
        assert_eq!(client.combine_responses(&responses[..1]), Err(BPIRError::UnexpectedResponseCount(NUM_SERVERS, 1)));
    }

    #[test_case(vec![4] => Err(BPIRError::InvalidServerIndex(4)); "Fault index must be in range")]
    #[test_case(vec![0, 1, 2, 3, 0] => Err(BPIRError::TooManyDishonestServers(5, 4)); "At most n faults")]
    #[test_case(vec![1] => Ok(()); "Valid fault is injected")]
    fn fault_injection(dishonest: Vec<usize>) -> Result<(), BPIRError> {
        let mut raw = vec![BigInt::from(5); NUM_SERVERS];
        inject_fault(&dishonest, &mut raw)
    }

    #[test]
    fn retrieval_checks_server_order() {
        let (_, encoding, client) = setup();

        let mut servers = encoding.distribute().unwrap();
        servers.swap(0, 1);

        assert_eq!(client.retrieve(&servers, 0, &[]), Err(BPIRError::InvalidServerIndex(1)));
        assert_eq!(client.retrieve(&servers[..2], 0, &[]), Err(BPIRError::UnexpectedResponseCount(NUM_SERVERS, 2)));
    }
}
