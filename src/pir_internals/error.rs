use std::{error::Error, fmt::Display};

/// Coarse classification of [`BPIRError`], letting callers tell misconfiguration apart from tampering or numerical bugs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad dimensions, out-of-range indices, too many simultaneous liars. Never retried.
    Precondition,
    /// Singular systems or non-convergent factorizations. Indicates a broken check-matrix invariant.
    Numerical,
    /// A response which can't have come from an honest server.
    Tampering,
    /// Randomness source failure.
    Entropy,
    /// Malformed wire bytes.
    Encoding,
    /// Unreadable or invalid configuration.
    Configuration,
}

#[derive(Debug, PartialEq)]
pub enum BPIRError {
    // Matrix
    InvalidMatrixDimension,
    InvalidNumberOfElementsInMatrix,
    IncompatibleDimensionForMatrixMultiplication,
    IncompatibleDimensionForMatrixVectorMultiplication,
    MatrixIndexOutOfRange(usize, usize),
    NonSquareMatrix(usize, usize),
    SingularLinearSystem,
    SvdDidNotConverge(usize),
    NonFiniteValue,
    CheckMatrixSeedsNotDistinct,
    ReconstructionMismatch(usize),

    // Setup
    RecordLengthExceedsServerCount(usize, usize),
    ZeroBlindingScalar,
    EntropySourceExhausted(String),
    DatabaseShapeMismatch((usize, usize), (usize, usize)),

    // PIR
    TargetIndexOutOfRange(usize, usize),
    UnexpectedResponseCount(usize, usize),
    InvalidServerIndex(usize),
    InvalidServerPartition,
    TooManyDishonestServers(usize, usize),
    InsufficientVerificationData,
    QueryLengthMismatch(usize, usize),
    NonExactResponseDivision(usize),

    // Serialization
    FailedToDeserializeQueryFromBytes(String),
    FailedToDeserializeResponseFromBytes(String),

    // Configuration
    FailedToReadConfig(String),
    MissingConfigKey(String),
    InvalidConfigValue(String, String),
}

impl BPIRError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SingularLinearSystem | Self::SvdDidNotConverge(_) | Self::NonFiniteValue | Self::CheckMatrixSeedsNotDistinct | Self::ReconstructionMismatch(_) => {
                ErrorKind::Numerical
            }
            Self::NonExactResponseDivision(_) => ErrorKind::Tampering,
            Self::EntropySourceExhausted(_) => ErrorKind::Entropy,
            Self::FailedToDeserializeQueryFromBytes(_) | Self::FailedToDeserializeResponseFromBytes(_) => ErrorKind::Encoding,
            Self::FailedToReadConfig(_) | Self::MissingConfigKey(_) | Self::InvalidConfigValue(_, _) => ErrorKind::Configuration,
            _ => ErrorKind::Precondition,
        }
    }
}

impl Display for BPIRError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMatrixDimension => write!(f, "The number of rows and columns in the matrix must be non-zero."),
            Self::InvalidNumberOfElementsInMatrix => write!(f, "The matrix must have 'rows * columns' elements."),
            Self::IncompatibleDimensionForMatrixMultiplication => write!(f, "The matrix dimensions do not allow multiplication."),
            Self::IncompatibleDimensionForMatrixVectorMultiplication => write!(f, "The vector length does not match the number of matrix columns."),
            Self::MatrixIndexOutOfRange(idx, bound) => write!(f, "Matrix row/ column index {} is out of range, must be < {}", idx, bound),
            Self::NonSquareMatrix(rows, cols) => write!(f, "Expected a square matrix, got {}x{}", rows, cols),
            Self::SingularLinearSystem => write!(f, "Linear system is singular, check matrix construction invariant is violated"),
            Self::SvdDidNotConverge(sweeps) => write!(f, "Singular value decomposition did not converge within '{}' sweeps", sweeps),
            Self::NonFiniteValue => write!(f, "Encountered a non-finite value while converting between float and integer domain"),
            Self::CheckMatrixSeedsNotDistinct => write!(f, "Check matrix seeds must be distinct and positive"),
            Self::ReconstructionMismatch(server) => write!(f, "Reconstructed answer of server {} does not match its commitment, precision was lost", server),

            Self::RecordLengthExceedsServerCount(l, n) => write!(f, "Record length ({}) must not exceed number of servers ({})", l, n),
            Self::ZeroBlindingScalar => write!(f, "Blinding scalars must be non-zero"),
            Self::EntropySourceExhausted(e) => write!(f, "Failed to draw randomness from OS entropy source: {}", e),
            Self::DatabaseShapeMismatch(expected, got) => {
                write!(f, "Expected a {}x{} record database, got {}x{}", expected.0, expected.1, got.0, got.1)
            }

            Self::TargetIndexOutOfRange(idx, m) => write!(f, "Target index {} is out of range, database has {} records", idx, m),
            Self::UnexpectedResponseCount(expected, got) => write!(f, "Expected {} server responses, got {}", expected, got),
            Self::InvalidServerIndex(idx) => write!(f, "Server index {} is out of range", idx),
            Self::InvalidServerPartition => write!(f, "Dishonest and honest server sets must partition all servers"),
            Self::TooManyDishonestServers(k, n) => write!(f, "{} dishonest servers can't be tolerated among {} servers", k, n),
            Self::InsufficientVerificationData => write!(f, "Verification table column does not cover all servers"),
            Self::QueryLengthMismatch(expected, got) => write!(f, "Query vectors must have {} elements, got {}", expected, got),
            Self::NonExactResponseDivision(server) => write!(f, "Response of server {} is not exactly divisible by blinding scalar, it was tampered with", server),

            Self::FailedToDeserializeQueryFromBytes(e) => write!(f, "Query deserialization failed with: {}", e),
            Self::FailedToDeserializeResponseFromBytes(e) => write!(f, "Response deserialization failed with: {}", e),

            Self::FailedToReadConfig(e) => write!(f, "Failed to read configuration: {}", e),
            Self::MissingConfigKey(key) => write!(f, "Configuration key '{}' is missing", key),
            Self::InvalidConfigValue(key, value) => write!(f, "Configuration key '{}' has invalid value '{}'", key, value),
        }
    }
}

impl Error for BPIRError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

#[cfg(test)]
mod test {
    use super::{BPIRError, ErrorKind};
    use test_case::test_case;

    #[test_case(BPIRError::TargetIndexOutOfRange(4, 4) => ErrorKind::Precondition; "Out of range target index is a precondition violation")]
    #[test_case(BPIRError::TooManyDishonestServers(6, 5) => ErrorKind::Precondition; "Too many liars is a precondition violation")]
    #[test_case(BPIRError::SingularLinearSystem => ErrorKind::Numerical; "Singular system is a numerical bug")]
    #[test_case(BPIRError::ReconstructionMismatch(3) => ErrorKind::Numerical; "Imprecise reconstruction is a numerical bug")]
    #[test_case(BPIRError::NonExactResponseDivision(1) => ErrorKind::Tampering; "Non-exact division signals tampering")]
    #[test_case(BPIRError::EntropySourceExhausted(String::new()) => ErrorKind::Entropy; "Entropy failure is its own kind")]
    #[test_case(BPIRError::MissingConfigKey("n".to_string()) => ErrorKind::Configuration; "Missing key is a configuration error")]
    fn error_kind_classification(err: BPIRError) -> ErrorKind {
        err.kind()
    }
}
