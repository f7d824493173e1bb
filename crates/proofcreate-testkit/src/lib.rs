//! # ProofCreate Testkit
//!
//! Testing utilities for ProofCreate.
//!
//! ## Overview
//!
//! - **Golden vectors**: byte inputs with known fingerprints
//! - **Generators**: proptest strategies for fingerprints, identities, and
//!   event logs
//! - **Fixtures**: a shared local ledger with several parties
//! - **Scripted ledger**: a call-recording [`LedgerClient`] stub whose
//!   failures and races are set up by the test
//!
//! ## Golden Vectors
//!
//! ```rust
//! use proofcreate_core::FingerprintEngine;
//! use proofcreate_testkit::vectors::all_vectors;
//!
//! for vector in all_vectors() {
//!     assert_eq!(FingerprintEngine::fingerprint(&vector.input).to_hex(), vector.expected);
//! }
//! ```
//!
//! ## Scripted Ledger
//!
//! ```rust
//! use proofcreate_core::Address;
//! use proofcreate_testkit::scripted::{Failure, LedgerOp, ScriptedLedger};
//!
//! let ledger = ScriptedLedger::new(Some(Address::from_bytes([1; 20])));
//! ledger.fail_next(LedgerOp::Lookup, Failure::Transport("offline".into()));
//! assert!(ledger.calls().is_empty());
//! ```
//!
//! [`LedgerClient`]: proofcreate_ledger::LedgerClient

pub mod fixtures;
pub mod generators;
pub mod scripted;
pub mod vectors;

pub use fixtures::{multi_party_fixture, LedgerFixture};
pub use scripted::{Failure, LedgerCall, LedgerOp, ScriptedLedger};
