//! Runtime-selected chain store.

use std::path::Path;

use async_trait::async_trait;
use proofcreate_core::{Address, ClaimEvent, ClaimRecord, ClaimTransaction, Fingerprint, TxHash};

use crate::error::Result;
use crate::memory::MemoryChainStore;
use crate::sqlite::SqliteChainStore;
use crate::traits::{ChainStore, CommitResult, EventFilter};

/// A chain store chosen at startup, typically from configuration.
pub enum ChainBackend {
    Memory(MemoryChainStore),
    Sqlite(SqliteChainStore),
}

impl ChainBackend {
    pub fn memory() -> Self {
        ChainBackend::Memory(MemoryChainStore::new())
    }

    pub fn sqlite(path: impl AsRef<Path>) -> Result<Self> {
        Ok(ChainBackend::Sqlite(SqliteChainStore::open(path)?))
    }

    fn store(&self) -> &dyn ChainStore {
        match self {
            ChainBackend::Memory(s) => s,
            ChainBackend::Sqlite(s) => s,
        }
    }
}

#[async_trait]
impl ChainStore for ChainBackend {
    async fn claim_record(&self, fingerprint: &Fingerprint) -> Result<ClaimRecord> {
        self.store().claim_record(fingerprint).await
    }

    async fn insert_pending(&self, tx: &ClaimTransaction) -> Result<TxHash> {
        self.store().insert_pending(tx).await
    }

    async fn take_pending(&self, hash: &TxHash) -> Result<Option<ClaimTransaction>> {
        self.store().take_pending(hash).await
    }

    async fn commit_claim(
        &self,
        tx_hash: &TxHash,
        fingerprint: &Fingerprint,
        owner: &Address,
        timestamp: u64,
    ) -> Result<CommitResult> {
        self.store()
            .commit_claim(tx_hash, fingerprint, owner, timestamp)
            .await
    }

    async fn events(&self, filter: &EventFilter, from: u64, to: u64) -> Result<Vec<ClaimEvent>> {
        self.store().events(filter, from, to).await
    }

    async fn head_block(&self) -> Result<u64> {
        self.store().head_block().await
    }

    async fn claim_count(&self) -> Result<u64> {
        self.store().claim_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_backends_agree() {
        let dir = TempDir::new().unwrap();
        let backends = [
            ChainBackend::memory(),
            ChainBackend::sqlite(dir.path().join("chain.db")).unwrap(),
        ];

        for backend in &backends {
            let fp = Fingerprint::from_bytes([1; 32]);
            let owner = Address::from_bytes([2; 20]);
            backend
                .commit_claim(&TxHash::hash(b"t"), &fp, &owner, 9)
                .await
                .unwrap();
            assert_eq!(
                backend.claim_record(&fp).await.unwrap(),
                ClaimRecord::present(owner, 9)
            );
            assert_eq!(backend.claim_count().await.unwrap(), 1);
        }
    }
}
