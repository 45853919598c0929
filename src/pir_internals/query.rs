use super::{
    branch_opt_util,
    error::BPIRError,
    params::BLINDING_VECTOR_BOUND,
    serialization::{self, ByteReader},
};
use num_bigint::BigInt;
use num_traits::Zero;
use rand::prelude::*;

/// Blinded query pair `(q1, q2)` sent to a single server, where `q1 = a·r` and `q2 = q1 + b·e`,
/// `r` being a fresh random vector and `e` the unit indicator of the target record.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    q1: Vec<BigInt>,
    q2: Vec<BigInt>,
}

/// A server's answer `(a1, a2) = (<share, q1>, <share, q2>)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub a1: BigInt,
    pub a2: BigInt,
}

impl Query {
    /// Generates a fresh blinded query for record `target_index` out of `num_records`.
    ///
    /// # Arguments
    ///
    /// * `a`, `b` - Non-zero blinding scalars.
    /// * `num_records` - Length of each query vector.
    /// * `target_index` - Index of the record to be retrieved, must be < `num_records`.
    /// * `rng` - Source of the blinding vector `r`, entries drawn from [0, BLINDING_VECTOR_BOUND). Need not be cryptographic.
    pub fn generate<R: Rng + ?Sized>(a: &BigInt, b: &BigInt, num_records: usize, target_index: usize, rng: &mut R) -> Result<Query, BPIRError> {
        if branch_opt_util::unlikely(target_index >= num_records) {
            return Err(BPIRError::TargetIndexOutOfRange(target_index, num_records));
        }
        if branch_opt_util::unlikely(a.is_zero() || b.is_zero()) {
            return Err(BPIRError::ZeroBlindingScalar);
        }

        let q1 = (0..num_records)
            .map(|_| a * BigInt::from(rng.random_range(0..BLINDING_VECTOR_BOUND)))
            .collect::<Vec<BigInt>>();

        let mut q2 = q1.clone();
        q2[target_index] += b;

        Ok(Query { q1, q2 })
    }

    #[inline(always)]
    pub fn num_records(&self) -> usize {
        self.q1.len()
    }

    pub fn vectors(&self) -> (&[BigInt], &[BigInt]) {
        (&self.q1, &self.q2)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        serialization::write_len(&mut buf, self.num_records());
        self.q1.iter().chain(&self.q2).for_each(|v| serialization::write_int(&mut buf, v));

        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Query, BPIRError> {
        let parse = || -> Result<Query, String> {
            let mut reader = ByteReader::new(bytes);

            let num_records = reader.read_len()?;
            let q1 = (0..num_records).map(|_| reader.read_int()).collect::<Result<Vec<BigInt>, String>>()?;
            let q2 = (0..num_records).map(|_| reader.read_int()).collect::<Result<Vec<BigInt>, String>>()?;
            reader.finish()?;

            Ok(Query { q1, q2 })
        };

        parse().map_err(BPIRError::FailedToDeserializeQueryFromBytes)
    }
}

impl Response {
    /// Recovers the raw answer `(a2 - a1) / b`, which equals the server's share of the target record.
    ///
    /// An honest response is always exactly divisible by `b`, so a non-zero remainder is reported as tampering by `server`.
    pub fn combine(&self, b: &BigInt, server: usize) -> Result<BigInt, BPIRError> {
        if branch_opt_util::unlikely(b.is_zero()) {
            return Err(BPIRError::ZeroBlindingScalar);
        }

        let diff = &self.a2 - &self.a1;
        if branch_opt_util::unlikely(!(&diff % b).is_zero()) {
            return Err(BPIRError::NonExactResponseDivision(server));
        }

        Ok(diff / b)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        serialization::write_int(&mut buf, &self.a1);
        serialization::write_int(&mut buf, &self.a2);

        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Response, BPIRError> {
        let parse = || -> Result<Response, String> {
            let mut reader = ByteReader::new(bytes);

            let a1 = reader.read_int()?;
            let a2 = reader.read_int()?;
            reader.finish()?;

            Ok(Response { a1, a2 })
        };

        parse().map_err(BPIRError::FailedToDeserializeResponseFromBytes)
    }
}
