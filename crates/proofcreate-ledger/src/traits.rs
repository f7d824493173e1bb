//! Ledger traits: the client contract workflows depend on, and the chain
//! storage interface behind the local ledger.

use std::sync::Arc;

use async_trait::async_trait;
use proofcreate_core::{
    Address, Claim, ClaimEvent, ClaimRecord, ClaimTransaction, Fingerprint, Identity,
    PendingTransaction, RejectReason, TxHash,
};

use crate::error::Result;

/// Block bound for event scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    /// The first block of the chain.
    Genesis,
    /// The current head.
    Latest,
    /// A specific block number.
    Number(u64),
}

impl BlockTag {
    /// Resolve against the current head block.
    pub fn resolve(self, head: u64) -> u64 {
        match self {
            BlockTag::Genesis => 0,
            BlockTag::Latest => head,
            BlockTag::Number(n) => n.min(head),
        }
    }
}

/// Indexed-field filter for claim event scans. `None` matches anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub owner: Option<Address>,
    pub fingerprint: Option<Fingerprint>,
}

impl EventFilter {
    /// Match every claim event.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match events whose owner is `owner`.
    pub fn by_owner(owner: Address) -> Self {
        Self {
            owner: Some(owner),
            fingerprint: None,
        }
    }

    /// Match events for one fingerprint.
    pub fn by_fingerprint(fingerprint: Fingerprint) -> Self {
        Self {
            owner: None,
            fingerprint: Some(fingerprint),
        }
    }

    pub fn matches(&self, event: &ClaimEvent) -> bool {
        self.owner.map_or(true, |o| o == event.owner)
            && self.fingerprint.map_or(true, |f| f == event.fingerprint)
    }
}

/// Final state of a broadcast claim transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// The claim is recorded on the ledger.
    Confirmed(Claim),
    /// The ledger refused the claim at execution time.
    Reverted(RejectReason),
}

/// Client connection to a claim ledger.
///
/// # Contract
///
/// - `lookup` returns the claim for a fingerprint, or `None` when the
///   ledger reports it does not exist.
/// - `scan_events` returns matching events in confirmation order
///   (ascending block, then log index), bounds inclusive.
/// - `submit_claim` signs and broadcasts a claim for the connection's
///   signer. A declined signature is `Err(LedgerError::Rejected)`; a
///   read-only connection is `Err(LedgerError::NoSigner)`.
/// - `await_confirmation` resolves a broadcast transaction to its final
///   state.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Read the claim for a fingerprint.
    async fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<Claim>>;

    /// Scan claim events between two block bounds.
    async fn scan_events(
        &self,
        filter: &EventFilter,
        from: BlockTag,
        to: BlockTag,
    ) -> Result<Vec<ClaimEvent>>;

    /// Sign and broadcast a claim on a fingerprint.
    async fn submit_claim(&self, fingerprint: &Fingerprint) -> Result<PendingTransaction>;

    /// Wait for a broadcast transaction to confirm or revert.
    async fn await_confirmation(&self, pending: &PendingTransaction) -> Result<Confirmation>;

    /// Number of claims ever recorded.
    async fn total_claims(&self) -> Result<u64>;

    /// Address this connection signs for, if any.
    fn signer(&self) -> Option<Address>;
}

/// Hands out ledger connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a signing connection for an identity.
    async fn connect(&self, identity: &Identity) -> Result<Arc<dyn LedgerClient>>;

    /// Open a connection that can only read.
    async fn connect_read_only(&self) -> Result<Arc<dyn LedgerClient>>;
}

/// Result of committing a claim to the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResult {
    /// A new block recorded the claim and emitted this event.
    Committed(ClaimEvent),
    /// The fingerprint was already claimed; nothing was written.
    AlreadyClaimed(Claim),
}

/// Persistence for the local ledger's chain state.
///
/// # Design Notes
///
/// - **Atomic commits**: `commit_claim` checks for an existing claim and
///   writes the claim plus its event in one step. Block numbers start at 1;
///   block 0 is genesis and carries no events.
/// - **Idempotent pending inserts**: inserting the same transaction twice
///   keeps one copy.
#[async_trait]
pub trait ChainStore: Send + Sync {
    /// Read the `(owner, timestamp, exists)` record for a fingerprint.
    async fn claim_record(&self, fingerprint: &Fingerprint) -> Result<ClaimRecord>;

    /// Queue a signed transaction for confirmation.
    async fn insert_pending(&self, tx: &ClaimTransaction) -> Result<TxHash>;

    /// Remove and return a queued transaction.
    async fn take_pending(&self, hash: &TxHash) -> Result<Option<ClaimTransaction>>;

    /// Record a claim in a new block unless the fingerprint is taken.
    async fn commit_claim(
        &self,
        tx_hash: &TxHash,
        fingerprint: &Fingerprint,
        owner: &Address,
        timestamp: u64,
    ) -> Result<CommitResult>;

    /// Events matching `filter` in blocks `from..=to`, in confirmation order.
    async fn events(&self, filter: &EventFilter, from: u64, to: u64) -> Result<Vec<ClaimEvent>>;

    /// Highest block number, 0 for an empty chain.
    async fn head_block(&self) -> Result<u64>;

    /// Number of recorded claims.
    async fn claim_count(&self) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofcreate_core::TxHash;

    fn event(owner: u8, fp: u8) -> ClaimEvent {
        ClaimEvent {
            fingerprint: Fingerprint::from_bytes([fp; 32]),
            owner: Address::from_bytes([owner; 20]),
            timestamp: 1,
            block: 1,
            log_index: 0,
            tx_hash: TxHash::hash(&[fp]),
        }
    }

    #[test]
    fn test_filter_matching() {
        let e = event(1, 2);
        assert!(EventFilter::all().matches(&e));
        assert!(EventFilter::by_owner(Address::from_bytes([1; 20])).matches(&e));
        assert!(!EventFilter::by_owner(Address::from_bytes([9; 20])).matches(&e));
        assert!(EventFilter::by_fingerprint(Fingerprint::from_bytes([2; 32])).matches(&e));
        assert!(!EventFilter::by_fingerprint(Fingerprint::from_bytes([3; 32])).matches(&e));
    }

    #[test]
    fn test_block_tag_resolve() {
        assert_eq!(BlockTag::Genesis.resolve(7), 0);
        assert_eq!(BlockTag::Latest.resolve(7), 7);
        assert_eq!(BlockTag::Number(3).resolve(7), 3);
        assert_eq!(BlockTag::Number(30).resolve(7), 7);
    }
}
