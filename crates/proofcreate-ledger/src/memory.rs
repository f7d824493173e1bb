//! In-memory implementation of the ChainStore trait.
//!
//! Same semantics as the SQLite store, with no persistence. Used by tests
//! and demos, and shared between several local ledger connections to model
//! multiple parties on one chain.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use proofcreate_core::{
    Address, Claim, ClaimEvent, ClaimRecord, ClaimTransaction, Fingerprint, TxHash,
};

use crate::error::{LedgerError, Result};
use crate::traits::{ChainStore, CommitResult, EventFilter};

/// In-memory chain store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryChainStore {
    inner: RwLock<MemoryChainInner>,
}

#[derive(Default)]
struct MemoryChainInner {
    /// Claims indexed by fingerprint.
    claims: HashMap<Fingerprint, Claim>,

    /// Append-only event log; block `n` holds `events[n - 1]`.
    events: Vec<ClaimEvent>,

    /// Broadcast transactions awaiting confirmation.
    pending: HashMap<TxHash, ClaimTransaction>,
}

impl MemoryChainStore {
    /// Create a new empty chain.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryChainInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryChainInner>> {
        self.inner
            .read()
            .map_err(|e| LedgerError::InvalidData(format!("chain lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryChainInner>> {
        self.inner
            .write()
            .map_err(|e| LedgerError::InvalidData(format!("chain lock poisoned: {}", e)))
    }
}

impl Default for MemoryChainStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainStore for MemoryChainStore {
    async fn claim_record(&self, fingerprint: &Fingerprint) -> Result<ClaimRecord> {
        let inner = self.read()?;
        Ok(inner
            .claims
            .get(fingerprint)
            .map(|c| ClaimRecord::present(c.owner, c.timestamp))
            .unwrap_or_else(ClaimRecord::absent))
    }

    async fn insert_pending(&self, tx: &ClaimTransaction) -> Result<TxHash> {
        let hash = tx.hash();
        self.write()?.pending.entry(hash).or_insert(*tx);
        Ok(hash)
    }

    async fn take_pending(&self, hash: &TxHash) -> Result<Option<ClaimTransaction>> {
        Ok(self.write()?.pending.remove(hash))
    }

    async fn commit_claim(
        &self,
        tx_hash: &TxHash,
        fingerprint: &Fingerprint,
        owner: &Address,
        timestamp: u64,
    ) -> Result<CommitResult> {
        let mut inner = self.write()?;

        if let Some(existing) = inner.claims.get(fingerprint) {
            return Ok(CommitResult::AlreadyClaimed(*existing));
        }

        let event = ClaimEvent {
            fingerprint: *fingerprint,
            owner: *owner,
            timestamp,
            block: inner.events.len() as u64 + 1,
            log_index: 0,
            tx_hash: *tx_hash,
        };
        inner.claims.insert(*fingerprint, event.claim());
        inner.events.push(event);

        Ok(CommitResult::Committed(event))
    }

    async fn events(&self, filter: &EventFilter, from: u64, to: u64) -> Result<Vec<ClaimEvent>> {
        let inner = self.read()?;
        Ok(inner
            .events
            .iter()
            .filter(|e| e.block >= from && e.block <= to && filter.matches(e))
            .copied()
            .collect())
    }

    async fn head_block(&self) -> Result<u64> {
        Ok(self.read()?.events.len() as u64)
    }

    async fn claim_count(&self) -> Result<u64> {
        Ok(self.read()?.claims.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofcreate_core::{Keypair, UnsignedClaim};

    fn fp(b: u8) -> Fingerprint {
        Fingerprint::from_bytes([b; 32])
    }

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    #[tokio::test]
    async fn test_commit_and_read() {
        let store = MemoryChainStore::new();
        assert_eq!(store.claim_record(&fp(1)).await.unwrap(), ClaimRecord::absent());

        let result = store
            .commit_claim(&TxHash::hash(b"a"), &fp(1), &addr(7), 1_700_000_000)
            .await
            .unwrap();
        let event = match result {
            CommitResult::Committed(e) => e,
            other => panic!("expected commit, got {:?}", other),
        };
        assert_eq!(event.block, 1);

        let record = store.claim_record(&fp(1)).await.unwrap();
        assert_eq!(record, ClaimRecord::present(addr(7), 1_700_000_000));
        assert_eq!(store.head_block().await.unwrap(), 1);
        assert_eq!(store.claim_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_commit_keeps_first_owner() {
        let store = MemoryChainStore::new();
        store
            .commit_claim(&TxHash::hash(b"a"), &fp(1), &addr(1), 10)
            .await
            .unwrap();
        let second = store
            .commit_claim(&TxHash::hash(b"b"), &fp(1), &addr(2), 20)
            .await
            .unwrap();

        match second {
            CommitResult::AlreadyClaimed(claim) => {
                assert_eq!(claim.owner, addr(1));
                assert_eq!(claim.timestamp, 10);
            }
            other => panic!("expected AlreadyClaimed, got {:?}", other),
        }
        assert_eq!(store.head_block().await.unwrap(), 1);
        assert_eq!(store.claim_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_events_filter_and_range() {
        let store = MemoryChainStore::new();
        for (i, owner) in [1u8, 2, 1, 1].iter().enumerate() {
            store
                .commit_claim(&TxHash::hash(&[i as u8]), &fp(i as u8), &addr(*owner), i as u64)
                .await
                .unwrap();
        }

        let mine = store
            .events(&EventFilter::by_owner(addr(1)), 0, 4)
            .await
            .unwrap();
        let blocks: Vec<u64> = mine.iter().map(|e| e.block).collect();
        assert_eq!(blocks, vec![1, 3, 4]);

        let windowed = store
            .events(&EventFilter::by_owner(addr(1)), 2, 3)
            .await
            .unwrap();
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0].block, 3);
    }

    #[tokio::test]
    async fn test_pending_take_once() {
        let store = MemoryChainStore::new();
        let keypair = Keypair::from_seed(&[3; 32]);
        let tx = ClaimTransaction::sign(UnsignedClaim::new(fp(5), keypair.public_key()), &keypair);

        let hash = store.insert_pending(&tx).await.unwrap();
        assert_eq!(store.insert_pending(&tx).await.unwrap(), hash);

        assert_eq!(store.take_pending(&hash).await.unwrap(), Some(tx));
        assert_eq!(store.take_pending(&hash).await.unwrap(), None);
    }
}
