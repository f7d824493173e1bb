//! # ProofCreate Ledger
//!
//! The ledger contract consumed by the ProofCreate workflows, and a
//! self-hosted local ledger that implements it.
//!
//! ## Overview
//!
//! Workflows talk to a ledger only through the [`LedgerClient`] trait:
//! a fingerprint lookup, a filtered event scan, a claim submission, and a
//! confirmation wait. Connections are handed out by a [`Connector`], either
//! bound to an identity's signer or read-only.
//!
//! [`LocalLedger`] enforces the claim contract over a pluggable
//! [`ChainStore`]:
//!
//! - [`MemoryChainStore`] - in-memory chain for tests and demos
//! - [`SqliteChainStore`] - persistent chain in a SQLite file
//! - [`ChainBackend`] - either of the above, chosen at runtime
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use proofcreate_core::{FingerprintEngine, Keypair};
//! use proofcreate_ledger::{
//!     Confirmation, LedgerClient, LocalLedger, LocalLedgerConfig, MemoryChainStore,
//! };
//!
//! async fn example() {
//!     let chain = Arc::new(MemoryChainStore::new());
//!     let keypair = Arc::new(Keypair::generate());
//!     let client = LocalLedger::connect(chain, keypair, LocalLedgerConfig::default());
//!
//!     let fp = FingerprintEngine::fingerprint(b"my artwork");
//!     let pending = client.submit_claim(&fp).await.unwrap();
//!     match client.await_confirmation(&pending).await.unwrap() {
//!         Confirmation::Confirmed(claim) => println!("claimed at {}", claim.timestamp),
//!         Confirmation::Reverted(reason) => println!("reverted: {}", reason),
//!     }
//! }
//! ```
//!
//! ## Contract Notes
//!
//! - **One claim per fingerprint**: a second confirmed claim reverts with
//!   [`RejectCode::AlreadyClaimed`](proofcreate_core::RejectCode)
//! - **Append-only events**: every confirmed claim emits one event, indexed
//!   by fingerprint and owner
//! - **Signed writes**: claims are accepted only with a valid signature from
//!   the key whose address becomes the owner

pub mod backend;
pub mod error;
pub mod local;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use backend::ChainBackend;
pub use error::{LedgerError, Result};
pub use local::{Clock, LocalConnector, LocalLedger, LocalLedgerConfig};
pub use memory::MemoryChainStore;
pub use sqlite::SqliteChainStore;
pub use traits::{
    BlockTag, ChainStore, CommitResult, Confirmation, Connector, EventFilter, LedgerClient,
};
