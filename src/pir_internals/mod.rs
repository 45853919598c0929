pub mod branch_opt_util;
pub mod commitment;
pub mod conversion;
pub mod error;
pub mod int_matrix;
pub mod matrix;
pub mod params;
pub mod query;
pub mod reconstruct;
pub mod serialization;
