//! The only place where values cross between exact integer arithmetic (queries, responses, shares) and
//! floating-point linear algebra (pseudo-inverse decoding, check-matrix reconstruction).
//!
//! Large integers lose precision when mapped to `f64`. Keeping the crossing here lets a rational or fixed-precision
//! backend replace it without touching protocol logic.

use super::{error::BPIRError, int_matrix::IntMatrix, matrix::Matrix};
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};

pub fn int_to_float(value: &BigInt) -> Result<f64, BPIRError> {
    value.to_f64().filter(|v| v.is_finite()).ok_or(BPIRError::NonFiniteValue)
}

/// Rounds to nearest integer. NaN and infinities can't be represented.
pub fn float_to_int(value: f64) -> Result<BigInt, BPIRError> {
    BigInt::from_f64(value.round()).ok_or(BPIRError::NonFiniteValue)
}

pub fn int_vec_to_float(values: &[BigInt]) -> Result<Vec<f64>, BPIRError> {
    values.iter().map(int_to_float).collect()
}

pub fn float_vec_to_int(values: &[f64]) -> Result<Vec<BigInt>, BPIRError> {
    values.iter().map(|&v| float_to_int(v)).collect()
}

pub fn int_matrix_to_float(mat: &IntMatrix) -> Result<Matrix, BPIRError> {
    Matrix::from_values(mat.num_rows(), mat.num_cols(), int_vec_to_float(mat.elems())?)
}

pub fn float_matrix_to_int(mat: &Matrix) -> Result<IntMatrix, BPIRError> {
    let elems = (0..mat.num_rows())
        .flat_map(|ridx| (0..mat.num_cols()).map(move |cidx| (ridx, cidx)))
        .map(|idx| float_to_int(mat[idx]))
        .collect::<Result<Vec<BigInt>, BPIRError>>()?;

    IntMatrix::from_values(mat.num_rows(), mat.num_cols(), elems)
}

#[cfg(test)]
mod test {
    use super::{float_to_int, float_vec_to_int, int_to_float, int_vec_to_float};
    use crate::pir_internals::error::BPIRError;
    use num_bigint::BigInt;
    use test_case::test_case;

    #[test_case(41.6 => Ok(BigInt::from(42)); "Rounds up to nearest")]
    #[test_case(-2.4 => Ok(BigInt::from(-2)); "Rounds negative values to nearest")]
    #[test_case(f64::NAN => Err(BPIRError::NonFiniteValue); "NaN is rejected")]
    #[test_case(f64::INFINITY => Err(BPIRError::NonFiniteValue); "Infinity is rejected")]
    fn float_to_int_conversion(value: f64) -> Result<BigInt, BPIRError> {
        float_to_int(value)
    }

    #[test]
    fn integers_within_mantissa_survive_round_trip() {
        let values = [0i64, 1, -1, 65_535, 1 << 52].iter().map(|&v| BigInt::from(v)).collect::<Vec<_>>();
        assert_eq!(float_vec_to_int(&int_vec_to_float(&values).unwrap()).unwrap(), values);
    }

    #[test]
    fn integer_too_large_for_float_is_rejected() {
        let huge = BigInt::from(1u8) << 1100;
        assert_eq!(int_to_float(&huge), Err(BPIRError::NonFiniteValue));
    }
}
