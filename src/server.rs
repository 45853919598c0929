use crate::{
    BPIRError,
    pir_internals::{
        branch_opt_util,
        query::{Query, Response},
    },
};
use num_bigint::BigInt;
use num_traits::Zero;

/// Represents one of the `n` storage servers in the Byzantine-robust PIR scheme.
///
/// A server holds exactly one row of the encoded share table, one share per record, and nothing else.
#[derive(Clone, Debug)]
pub struct Server {
    index: usize,
    share_row: Vec<BigInt>,
}

impl Server {
    pub fn new(index: usize, share_row: Vec<BigInt>) -> Result<Server, BPIRError> {
        if branch_opt_util::unlikely(share_row.is_empty()) {
            return Err(BPIRError::InvalidMatrixDimension);
        }

        Ok(Server { index, share_row })
    }

    #[inline(always)]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline(always)]
    pub fn num_records(&self) -> usize {
        self.share_row.len()
    }

    /// Reduces the stored share row against a blinded query pair: `a1 = <share, q1>` and `a2 = <share, q2>`, in arbitrary precision.
    ///
    /// Stateless and deterministic. The server learns nothing about the target index beyond what the blinded vectors reveal.
    pub fn respond(&self, query: &Query) -> Result<Response, BPIRError> {
        if branch_opt_util::unlikely(query.num_records() != self.num_records()) {
            return Err(BPIRError::QueryLengthMismatch(self.num_records(), query.num_records()));
        }

        let (q1, q2) = query.vectors();

        Ok(Response {
            a1: inner_product(&self.share_row, q1),
            a2: inner_product(&self.share_row, q2),
        })
    }

    /// Byte-oriented variant of [`Server::respond`], for when queries arrive over a transport.
    ///
    /// # Arguments
    ///
    /// * `query` - Serialized query, as produced by `Query::to_bytes`.
    ///
    /// # Returns
    ///
    /// Serialized response, to be parsed with `Response::from_bytes`.
    pub fn respond_to_bytes(&self, query: &[u8]) -> Result<Vec<u8>, BPIRError> {
        let query = Query::from_bytes(query)?;
        let response = self.respond(&query)?;

        Ok(response.to_bytes())
    }
}

fn inner_product(lhs: &[BigInt], rhs: &[BigInt]) -> BigInt {
    lhs.iter().zip(rhs).fold(BigInt::zero(), |acc, (x, y)| acc + x * y)
}

#[cfg(test)]
mod test {
    use super::Server;
    use crate::{
        BPIRError,
        pir_internals::query::{Query, Response},
    };
    use num_bigint::BigInt;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    fn server_with_shares(shares: &[i64]) -> Server {
        Server::new(0, shares.iter().map(|&v| BigInt::from(v)).collect()).unwrap()
    }

    #[test]
    fn server_answers_with_inner_products() {
        let server = server_with_shares(&[3, 1, 4, 1, 5]);
        let mut rng = ChaCha8Rng::from_os_rng();

        let query = Query::generate(&BigInt::from(2), &BigInt::from(3), 5, 2, &mut rng).unwrap();
        let response = server.respond(&query).unwrap();

        let (q1, _) = query.vectors();
        let expected_a1 = q1.iter().zip([3, 1, 4, 1, 5]).map(|(q, s)| q * s).sum::<BigInt>();

        assert_eq!(response.a1, expected_a1);
        assert_eq!(&response.a2 - &response.a1, BigInt::from(3 * 4));
    }

    #[test]
    fn byte_oriented_response_matches_typed_response() {
        let server = server_with_shares(&[10, 20, 30]);
        let mut rng = ChaCha8Rng::from_os_rng();

        let query = Query::generate(&BigInt::from(5), &BigInt::from(7), 3, 1, &mut rng).unwrap();

        let response_bytes = server.respond_to_bytes(&query.to_bytes()).unwrap();
        assert_eq!(Response::from_bytes(&response_bytes).unwrap(), server.respond(&query).unwrap());
    }

    #[test]
    fn query_of_wrong_length_is_rejected() {
        let server = server_with_shares(&[10, 20, 30]);
        let mut rng = ChaCha8Rng::from_os_rng();

        let query = Query::generate(&BigInt::from(5), &BigInt::from(7), 4, 1, &mut rng).unwrap();
        assert_eq!(server.respond(&query), Err(BPIRError::QueryLengthMismatch(3, 4)));
        assert!(Server::new(1, vec![]).is_err());
    }
}
