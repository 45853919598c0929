//! Byzantine-robust multi-server **P**rivate **I**nformation **R**etrieval (PIR).
//!
//! A database of `m` records, each `l` integer blocks long, is linearly encoded into `n` shares per record and spread over `n`
//! servers. A client retrieves one record without any single server learning which one, while tolerating servers which return
//! wrong answers: each answer is checked against a hash commitment, and answers failing the check are recomputed from a
//! public verification table and the honest answers.
//!
//! ## Features
//!
//! * **Index hiding:** Each server receives a pair of blinded vectors `(a·r, a·r + b·e_I)`, with a fresh random `r` per server.
//! * **Byzantine localization:** Lying servers are identified exactly, not guessed, by comparing against per-share commitments.
//! * **Recovery:** Answers of up to `n` dishonest servers are reconstructed via a check matrix whose square submatrices are all non-singular.
//! * **Exact arithmetic where it matters:** Shares, queries and responses are arbitrary-precision integers, floating point is only used for decoding and reconstruction.
//!
//! ## Usage
//!
//! Add it as dependency to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! byzantine_pir = "=0.1.0"
//! ```
//!
//! Then, you can use it in your code:
//!
//! ```rust
//! use byzantine_pir::{Client, Encoding, RecordDatabase, inject_fault};
//!
//! fn main() {
//!     // 5 servers, 3 blocks per record, 4 records, 2 byte blocks
//!     let db = RecordDatabase::generate(3, 4, 2).expect("Failed to generate database");
//!
//!     // Setup (offline phase)
//!     let encoding = Encoding::new(5, &db).expect("Failed to encode database");
//!     let servers = encoding.distribute().expect("Failed to distribute shares");
//!     let client = Client::setup(&encoding, 7, 13).expect("Client setup failed");
//!
//!     // Client queries (online phase), one for each server
//!     let target_index = 2;
//!     let queries = client.query(target_index).expect("Failed to generate queries");
//!
//!     // Each server responds to its own query
//!     let responses = servers.iter().zip(&queries).map(|(server, query)| server.respond(query).expect("Server failed to respond")).collect::<Vec<_>>();
//!
//!     // Pretend servers 0 and 1 lied
//!     let mut raw = client.combine_responses(&responses).expect("Tampered response");
//!     inject_fault(&[0, 1], &mut raw).expect("Invalid server index");
//!
//!     // Client localizes liars, recovers their answers and decodes the record
//!     let retrieval = client.recover_record(target_index, &raw).expect("Failed to recover record");
//!
//!     assert_eq!(retrieval.dishonest, vec![0, 1]);
//!     assert_eq!(retrieval.record, db.record(target_index).unwrap());
//! }
//! ```
//!
//! ## Modules
//!
//! * `encoder`: Record database, and the one-time setup phase producing server shares and client decoding state.
//! * `server`: Contains the `Server` struct, holding one row of shares and answering blinded queries.
//! * `client`: Contains the `Client` struct, generating queries, verifying answers, reconstructing and decoding records.
//! * `config`: Key-value configuration of protocol parameters.

pub use client::{Client, Retrieval, Verdict, inject_fault};
pub use config::Config;
pub use encoder::{Encoding, RecordDatabase};
pub use pir_internals::error::{BPIRError, ErrorKind};
pub use pir_internals::query::{Query, Response};
pub use server::Server;

pub mod client;
pub mod config;
pub mod encoder;
pub mod server;

mod pir_internals;

mod test_pir;
