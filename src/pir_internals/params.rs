/// Singular values at or below this are treated as zero, both for rank counting and pseudo-inversion.
pub const SINGULAR_VALUE_TOLERANCE: f64 = 1e-10;
/// Relative pivot magnitude below which a square system is reported singular.
pub const PIVOT_TOLERANCE: f64 = 1e-12;
pub const SVD_MAX_SWEEPS: usize = 64;
/// Jacobi sweeps stop rotating a column pair once its normalized inner product drops below this.
pub const SVD_ORTHOGONALITY_TOLERANCE: f64 = 1e-13;

/// Encoding matrix entries are sampled from [1, ENCODING_MATRIX_MAX_ENTRY].
pub const ENCODING_MATRIX_MAX_ENTRY: u32 = 100;
/// Check matrix seeds are `n` distinct values sampled from [1, CHECK_MATRIX_SEED_SPREAD * n].
pub const CHECK_MATRIX_SEED_SPREAD: usize = 2;
/// Entries of the query blinding vector `r` lie in [0, BLINDING_VECTOR_BOUND).
pub const BLINDING_VECTOR_BOUND: u32 = 10;

pub const BIT_SECURITY_LEVEL: usize = 128;
pub const COMMITMENT_BYTE_LEN: usize = (2 * BIT_SECURITY_LEVEL) / 8;

/// Raw response value which fault injection substitutes for a lying server's answer.
pub const FAULT_SENTINEL: i64 = -1;
