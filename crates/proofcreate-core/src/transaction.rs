//! Claim transactions and ledger rejection reasons.
//!
//! A claim transaction asks the ledger to record `sender` as the owner of a
//! fingerprint. The sender's address is derived from the signing key, so a
//! transaction can only claim on behalf of the key that signed it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::{canonical_transaction_bytes, decode_transaction, sign_message};
use crate::crypto::{Keypair, PublicKey, Signature, TxHash};
use crate::error::{Result, SignError};
use crate::fingerprint::Fingerprint;
use crate::identity::Address;

/// The signed content of a claim transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsignedClaim {
    pub fingerprint: Fingerprint,
    pub sender: PublicKey,
    /// Distinguishes otherwise identical submissions.
    pub nonce: u64,
}

impl UnsignedClaim {
    /// Build an unsigned claim with a random nonce.
    pub fn new(fingerprint: Fingerprint, sender: PublicKey) -> Self {
        Self {
            fingerprint,
            sender,
            nonce: rand::random(),
        }
    }

    /// The message that must be signed.
    pub fn signing_message(&self) -> Vec<u8> {
        sign_message(self)
    }
}

/// A signed claim transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimTransaction {
    pub claim: UnsignedClaim,
    pub signature: Signature,
}

impl ClaimTransaction {
    /// Sign a claim with a keypair.
    pub fn sign(claim: UnsignedClaim, keypair: &Keypair) -> Self {
        let signature = keypair.sign(&claim.signing_message());
        Self { claim, signature }
    }

    /// Verify the signature against the embedded sender key.
    pub fn verify(&self) -> Result<()> {
        self.claim
            .sender
            .verify(&self.claim.signing_message(), &self.signature)
    }

    /// Content hash of the signed transaction.
    pub fn hash(&self) -> TxHash {
        TxHash::hash(&self.to_bytes())
    }

    /// Address recorded as owner when the transaction confirms.
    pub fn sender_address(&self) -> Address {
        self.claim.sender.address()
    }

    /// Canonical encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        canonical_transaction_bytes(self)
    }

    /// Decode the canonical encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode_transaction(bytes)
    }
}

/// Handle to a broadcast transaction awaiting confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub hash: TxHash,
    pub fingerprint: Fingerprint,
    pub sender: Address,
}

/// Structured category of a ledger refusal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectCode {
    /// The fingerprint already has a claim.
    AlreadyClaimed,
    /// The key holder declined to authorize the transaction.
    Declined,
    /// The transaction signature did not verify.
    InvalidSignature,
    /// The ledger gave no category.
    Unspecified,
}

/// Why the ledger refused a claim. The message is surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectReason {
    pub code: RejectCode,
    pub message: String,
}

impl RejectReason {
    pub fn new(code: RejectCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn already_claimed(fingerprint: &Fingerprint) -> Self {
        Self::new(
            RejectCode::AlreadyClaimed,
            format!("fingerprint {} is already claimed", fingerprint),
        )
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self::new(RejectCode::Declined, message)
    }

    pub fn is_duplicate(&self) -> bool {
        self.code == RejectCode::AlreadyClaimed
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

/// Capability to authorize claim transactions for one address.
///
/// Key custody lives behind this trait; the ledger client only ever sees
/// public keys and signatures.
pub trait TransactionSigner: Send + Sync {
    /// Public key the signer signs with.
    fn public_key(&self) -> PublicKey;

    /// Address the signer claims for.
    fn address(&self) -> Address {
        self.public_key().address()
    }

    /// Authorize a claim. May be declined by the key holder.
    fn sign_claim(&self, claim: &UnsignedClaim) -> std::result::Result<Signature, SignError>;
}

impl TransactionSigner for Keypair {
    fn public_key(&self) -> PublicKey {
        Keypair::public_key(self)
    }

    fn sign_claim(&self, claim: &UnsignedClaim) -> std::result::Result<Signature, SignError> {
        Ok(self.sign(&claim.signing_message()))
    }
}
