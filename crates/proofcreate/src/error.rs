//! Error types for the ProofCreate workflows.
//!
//! Ledger outcomes (claimed, not claimed, rejected, unreachable) are not
//! errors; they are [`WorkflowResult`](crate::WorkflowResult) values. The
//! errors here are precondition failures and fatal input problems.

use proofcreate_core::{CoreError, Fingerprint};
use proofcreate_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProofError {
    /// A write was requested without an authenticated identity.
    #[error("not authenticated: connect an account first")]
    NotAuthenticated,

    /// No ledger connection and no read fallback.
    #[error("not connected to a ledger")]
    NotConnected,

    /// The session's connection was opened for a different identity.
    #[error("stale session: {0}")]
    StaleSession(String),

    /// A registration for this fingerprint is already in flight.
    #[error("registration already in progress for {0}")]
    Busy(Fingerprint),

    /// No claim exists for the fingerprint.
    #[error("no claim found for {0}")]
    NotFound(Fingerprint),

    /// The input could not be fingerprinted.
    #[error("input error: {0}")]
    Input(#[from] CoreError),

    /// Ledger error outside a workflow outcome.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, ProofError>;
