//! Error types for ProofCreate Core.

use thiserror::Error;

/// Core errors that can occur while fingerprinting or handling claim data.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The content source could not be read to the end.
    #[error("failed to read content: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Errors raised by a [`TransactionSigner`](crate::TransactionSigner).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    /// The holder of the key refused to sign.
    #[error("signature request declined: {0}")]
    Declined(String),

    /// The signer is not able to sign for the requested sender.
    #[error("signer unavailable: {0}")]
    Unavailable(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
