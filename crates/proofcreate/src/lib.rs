//! # ProofCreate
//!
//! Prove authorship of a file by recording its fingerprint on a ledger,
//! and let anyone check whether a fingerprint is already claimed.
//!
//! ## Overview
//!
//! - **Fingerprints**: SHA-256 of the file bytes, written `0x` + 64 hex
//! - **Registration**: pre-check, one claim transaction, wait for
//!   confirmation, classify the outcome
//! - **Verification**: read-only lookup, works without an identity
//! - **History**: an identity's claims rebuilt from the ledger event log
//! - **Certificates**: display-ready detail of one claim
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use proofcreate::{Identity, Keypair, ProofConfig, ProofCreate, Session, WorkflowResult};
//!
//! async fn example() -> proofcreate::Result<()> {
//!     let config = ProofConfig::from_toml_file("proofcreate.toml")?;
//!     let connector = Arc::new(config.local_connector()?);
//!     let address = connector.add_signer(Arc::new(Keypair::generate()))?;
//!
//!     let app = ProofCreate::new(&config, connector);
//!     let mut session = Session::authenticated(Identity::new(address));
//!     app.connect(&mut session).await?;
//!
//!     let fingerprint = app.fingerprint_file("artwork.png")?;
//!     match app.register(&session, &fingerprint).await? {
//!         WorkflowResult::Success(claim) => println!("claimed at {}", claim.timestamp),
//!         other => println!("{}", other),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `proofcreate::core` - fingerprints, identities, claims, transactions
//! - `proofcreate::ledger` - the ledger contract and the local ledger

pub mod app;
pub mod certificate;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod outcome;
pub mod registration;
pub mod session;
pub mod verification;

// Re-export component crates
pub use proofcreate_core as core;
pub use proofcreate_ledger as ledger;

pub use app::ProofCreate;
pub use certificate::{Certificate, CertificateResolver};
pub use config::{LedgerBackendConfig, ProofConfig};
pub use error::{ProofError, Result};
pub use history::{project, HistoryOrder, HistoryProjector};
pub use logging::{init_logging, LogFormat};
pub use outcome::WorkflowResult;
pub use registration::{RegistrationStage, RegistrationWorkflow};
pub use session::{ReadFallback, Session};
pub use verification::VerificationWorkflow;

// Commonly used core types
pub use proofcreate_core::{
    Address, Claim, ClaimEvent, ClaimSummary, Fingerprint, FingerprintEngine, Identity, Keypair,
    RejectCode, RejectReason,
};
