//! Error types for ledger operations.

use proofcreate_core::{CoreError, RejectReason, TxHash};
use thiserror::Error;

/// Errors that can occur while talking to a ledger.
///
/// Everything except [`LedgerError::Rejected`] means the ledger could not be
/// reached or could not answer, so the effect of the operation is unknown.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger could not be reached.
    #[error("ledger unreachable: {0}")]
    Transport(String),

    /// A write was requested on a connection without a signer.
    #[error("no signer available: {0}")]
    NoSigner(String),

    /// The ledger definitively refused the transaction.
    #[error("transaction rejected: {0}")]
    Rejected(RejectReason),

    /// Confirmation was requested for a transaction the ledger never saw.
    #[error("unknown transaction: {0}")]
    UnknownTransaction(TxHash),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Transaction encoding or decoding failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] CoreError),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Whether this is a definite refusal rather than a transport failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, LedgerError::Rejected(_))
    }

    /// The refusal reason, if this is a rejection.
    pub fn rejection(&self) -> Option<&RejectReason> {
        match self {
            LedgerError::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
