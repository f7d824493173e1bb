//! Ledger addresses and the authenticated identity of a session.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::crypto::PublicKey;
use crate::error::{CoreError, Result};

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte ledger address.
///
/// Derived from the last 20 bytes of SHA-256 over an Ed25519 public key.
/// Rendered as `0x` followed by 40 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Derive the address controlled by a public key.
    pub fn from_public_key(key: &PublicKey) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        let mut arr = [0u8; ADDRESS_LEN];
        arr.copy_from_slice(&digest[32 - ADDRESS_LEN..]);
        Self(arr)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse a `0x`-prefixed hex address.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| CoreError::InvalidAddress("missing 0x marker".into()))?;
        let bytes = hex::decode(digits).map_err(|e| CoreError::InvalidAddress(e.to_string()))?;
        let arr: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            CoreError::InvalidAddress(format!("expected {} bytes, got {}", ADDRESS_LEN, b.len()))
        })?;
        Ok(Self(arr))
    }

    /// Abbreviated form: `0x1234...abcd`.
    pub fn short(&self) -> String {
        let full = self.to_hex();
        format!("{}...{}", &full[..6], &full[38..])
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

/// The authenticated actor of a session.
///
/// Set by the authentication collaborator (a wallet) and treated as read-only
/// by the workflows.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    address: Address,
}

impl Identity {
    pub const fn new(address: Address) -> Self {
        Self { address }
    }

    pub const fn address(&self) -> Address {
        self.address
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.address.short())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.address, f)
    }
}

impl From<Address> for Identity {
    fn from(address: Address) -> Self {
        Self::new(address)
    }
}
