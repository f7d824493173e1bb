//! # ProofCreate Core
//!
//! Pure primitives for ProofCreate: content fingerprints, claims, and the
//! signed claim transactions that put a fingerprint on a ledger.
//!
//! This crate contains no networking and no storage. The only I/O it performs
//! is reading the content being fingerprinted.
//!
//! ## Key Types
//!
//! - [`Fingerprint`] - SHA-256 digest of file content, rendered as `0x` + hex
//! - [`FingerprintEngine`] - Computes fingerprints from slices, readers, files
//! - [`Address`] / [`Identity`] - Who owns a claim
//! - [`Claim`] / [`ClaimEvent`] - Ledger-resident ownership records
//! - [`ClaimTransaction`] - A signed request to claim a fingerprint
//! - [`RejectReason`] - Structured reason a ledger refused a claim
//!
//! ## Canonicalization
//!
//! Claim transactions are signed and hashed over deterministic CBOR. See the
//! [`canonical`] module.

pub mod canonical;
pub mod claim;
pub mod crypto;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod transaction;

pub use canonical::{canonical_transaction_bytes, canonical_unsigned_bytes, SIGN_DOMAIN};
pub use claim::{Claim, ClaimEvent, ClaimRecord, ClaimSummary};
pub use crypto::{Keypair, PublicKey, Signature, TxHash};
pub use error::{CoreError, Result, SignError};
pub use fingerprint::{Fingerprint, FingerprintEngine, FINGERPRINT_LEN, FINGERPRINT_PREFIX};
pub use identity::{Address, Identity, ADDRESS_LEN};
pub use transaction::{
    ClaimTransaction, PendingTransaction, RejectCode, RejectReason, TransactionSigner,
    UnsignedClaim,
};
