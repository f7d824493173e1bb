//! Claims: ledger-resident ownership records keyed by fingerprint.
//!
//! A fingerprint maps to at most one claim for its lifetime. Claims are
//! created once, never modified, never deleted. Each creation emits one
//! [`ClaimEvent`] into the ledger's append-only log.

use serde::{Deserialize, Serialize};

use crate::crypto::TxHash;
use crate::fingerprint::Fingerprint;
use crate::identity::Address;

/// An ownership claim on a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    /// The claimed content fingerprint.
    pub fingerprint: Fingerprint,
    /// Address that submitted the claim.
    pub owner: Address,
    /// Ledger-assigned creation time (seconds since epoch).
    pub timestamp: u64,
}

impl Claim {
    pub fn is_owned_by(&self, address: &Address) -> bool {
        &self.owner == address
    }
}

/// The raw `(owner, timestamp, exists)` triple returned by the ledger's
/// read function.
///
/// Unclaimed fingerprints read back as a zero owner, zero timestamp, and
/// `exists == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub owner: Address,
    pub timestamp: u64,
    pub exists: bool,
}

impl ClaimRecord {
    /// The record of an unclaimed fingerprint.
    pub const fn absent() -> Self {
        Self {
            owner: Address::from_bytes([0u8; 20]),
            timestamp: 0,
            exists: false,
        }
    }

    /// The record of an existing claim.
    pub const fn present(owner: Address, timestamp: u64) -> Self {
        Self {
            owner,
            timestamp,
            exists: true,
        }
    }

    /// Interpret the record for `fingerprint`, using the existence flag only.
    pub fn into_claim(self, fingerprint: Fingerprint) -> Option<Claim> {
        self.exists.then_some(Claim {
            fingerprint,
            owner: self.owner,
            timestamp: self.timestamp,
        })
    }
}

/// Log entry emitted when a claim is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimEvent {
    pub fingerprint: Fingerprint,
    pub owner: Address,
    pub timestamp: u64,
    /// Block that confirmed the claim.
    pub block: u64,
    /// Position of the event within its block.
    pub log_index: u32,
    /// Transaction that created the claim.
    pub tx_hash: TxHash,
}

impl ClaimEvent {
    /// The claim this event created.
    pub fn claim(&self) -> Claim {
        Claim {
            fingerprint: self.fingerprint,
            owner: self.owner,
            timestamp: self.timestamp,
        }
    }

    /// Confirmation order key.
    pub fn position(&self) -> (u64, u32) {
        (self.block, self.log_index)
    }
}

/// Display-ready projection of a claim for history listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSummary {
    pub fingerprint: Fingerprint,
    /// Truncated fingerprint for card views.
    pub display: String,
    pub owner: Address,
    pub timestamp: u64,
    pub block: u64,
}

impl ClaimSummary {
    pub fn from_event(event: &ClaimEvent, display_len: usize) -> Self {
        Self {
            fingerprint: event.fingerprint,
            display: event.fingerprint.short(display_len),
            owner: event.owner,
            timestamp: event.timestamp,
            block: event.block,
        }
    }

    pub fn claim(&self) -> Claim {
        Claim {
            fingerprint: self.fingerprint,
            owner: self.owner,
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_existence_flag_decides() {
        let fp = Fingerprint::from_bytes([1; 32]);
        assert_eq!(ClaimRecord::absent().into_claim(fp), None);

        let owner = Address::from_bytes([9; 20]);
        let claim = ClaimRecord::present(owner, 1_700_000_000)
            .into_claim(fp)
            .unwrap();
        assert_eq!(claim.owner, owner);
        assert_eq!(claim.timestamp, 1_700_000_000);
        assert!(claim.is_owned_by(&owner));
    }

    #[test]
    fn test_summary_from_event() {
        let event = ClaimEvent {
            fingerprint: Fingerprint::from_bytes([0xcd; 32]),
            owner: Address::from_bytes([2; 20]),
            timestamp: 42,
            block: 7,
            log_index: 0,
            tx_hash: TxHash::from_bytes([3; 32]),
        };
        let summary = ClaimSummary::from_event(&event, 20);
        assert_eq!(summary.display, "0xcdcdcdcdcdcdcdcdcd...");
        assert_eq!(summary.claim(), event.claim());
        assert_eq!(summary.block, 7);
    }

    #[test]
    fn test_claim_json_shape() {
        let claim = Claim {
            fingerprint: Fingerprint::from_bytes([0; 32]),
            owner: Address::from_bytes([0; 20]),
            timestamp: 5,
        };
        let json = serde_json::to_value(claim).unwrap();
        assert_eq!(json["timestamp"], 5);
    }
}
