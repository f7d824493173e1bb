//! SQLite implementation of the ChainStore trait.
//!
//! The persistent backend for the local ledger. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use proofcreate_core::{
    Address, Claim, ClaimEvent, ClaimRecord, ClaimTransaction, Fingerprint, TxHash,
};

use crate::error::{LedgerError, Result};
use crate::migration::{self, now_secs};
use crate::traits::{ChainStore, CommitResult, EventFilter};

/// SQLite-based chain store.
///
/// Thread-safe via internal Mutex. All operations run on the blocking pool.
pub struct SqliteChainStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteChainStore {
    /// Open a chain database at the given path, creating and migrating it
    /// as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory chain database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| LedgerError::InvalidData(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| LedgerError::Transport(format!("blocking task failed: {}", e)))?
    }
}

fn to_array<const N: usize>(bytes: Vec<u8>, column: &str) -> Result<[u8; N]> {
    bytes.try_into().map_err(|b: Vec<u8>| {
        LedgerError::InvalidData(format!("{}: expected {} bytes, got {}", column, N, b.len()))
    })
}

type EventRow = (i64, i64, Vec<u8>, Vec<u8>, i64, Vec<u8>);

fn row_to_event(row: EventRow) -> Result<ClaimEvent> {
    let (block, log_index, fingerprint, owner, timestamp, tx_hash) = row;
    Ok(ClaimEvent {
        fingerprint: Fingerprint::from_bytes(to_array(fingerprint, "fingerprint")?),
        owner: Address::from_bytes(to_array(owner, "owner")?),
        timestamp: timestamp as u64,
        block: block as u64,
        log_index: log_index as u32,
        tx_hash: TxHash(to_array(tx_hash, "tx_hash")?),
    })
}

#[async_trait]
impl ChainStore for SqliteChainStore {
    async fn claim_record(&self, fingerprint: &Fingerprint) -> Result<ClaimRecord> {
        let fingerprint = *fingerprint;
        self.blocking(move |conn| {
            let row: Option<(Vec<u8>, i64)> = conn
                .query_row(
                    "SELECT owner, timestamp FROM claims WHERE fingerprint = ?1",
                    params![&fingerprint.0[..]],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match row {
                Some((owner, timestamp)) => Ok(ClaimRecord::present(
                    Address::from_bytes(to_array(owner, "owner")?),
                    timestamp as u64,
                )),
                None => Ok(ClaimRecord::absent()),
            }
        })
        .await
    }

    async fn insert_pending(&self, tx: &ClaimTransaction) -> Result<TxHash> {
        let hash = tx.hash();
        let fingerprint = tx.claim.fingerprint;
        let bytes = tx.to_bytes();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO pending_transactions
                    (tx_hash, fingerprint, tx_bytes, submitted_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![&hash.0[..], &fingerprint.0[..], bytes, now_secs()],
            )?;
            Ok(hash)
        })
        .await
    }

    async fn take_pending(&self, hash: &TxHash) -> Result<Option<ClaimTransaction>> {
        let hash = *hash;
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let bytes: Option<Vec<u8>> = tx
                .query_row(
                    "SELECT tx_bytes FROM pending_transactions WHERE tx_hash = ?1",
                    params![&hash.0[..]],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(bytes) = bytes else {
                return Ok(None);
            };

            tx.execute(
                "DELETE FROM pending_transactions WHERE tx_hash = ?1",
                params![&hash.0[..]],
            )?;
            tx.commit()?;

            Ok(Some(ClaimTransaction::from_bytes(&bytes)?))
        })
        .await
    }

    async fn commit_claim(
        &self,
        tx_hash: &TxHash,
        fingerprint: &Fingerprint,
        owner: &Address,
        timestamp: u64,
    ) -> Result<CommitResult> {
        let (tx_hash, fingerprint, owner) = (*tx_hash, *fingerprint, *owner);
        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let existing: Option<(Vec<u8>, i64)> = tx
                .query_row(
                    "SELECT owner, timestamp FROM claims WHERE fingerprint = ?1",
                    params![&fingerprint.0[..]],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            if let Some((existing_owner, existing_ts)) = existing {
                return Ok(CommitResult::AlreadyClaimed(Claim {
                    fingerprint,
                    owner: Address::from_bytes(to_array(existing_owner, "owner")?),
                    timestamp: existing_ts as u64,
                }));
            }

            let head: i64 = tx.query_row(
                "SELECT COALESCE(MAX(block), 0) FROM claim_events",
                [],
                |row| row.get(0),
            )?;
            let block = head + 1;

            tx.execute(
                "INSERT INTO claims (fingerprint, owner, timestamp, block, tx_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    &fingerprint.0[..],
                    &owner.0[..],
                    timestamp as i64,
                    block,
                    &tx_hash.0[..]
                ],
            )?;
            tx.execute(
                "INSERT INTO claim_events
                    (block, log_index, fingerprint, owner, timestamp, tx_hash)
                 VALUES (?1, 0, ?2, ?3, ?4, ?5)",
                params![
                    block,
                    &fingerprint.0[..],
                    &owner.0[..],
                    timestamp as i64,
                    &tx_hash.0[..]
                ],
            )?;
            tx.commit()?;

            Ok(CommitResult::Committed(ClaimEvent {
                fingerprint,
                owner,
                timestamp,
                block: block as u64,
                log_index: 0,
                tx_hash,
            }))
        })
        .await
    }

    async fn events(&self, filter: &EventFilter, from: u64, to: u64) -> Result<Vec<ClaimEvent>> {
        let owner = filter.owner.map(|a| a.0.to_vec());
        let fingerprint = filter.fingerprint.map(|f| f.0.to_vec());
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT block, log_index, fingerprint, owner, timestamp, tx_hash
                 FROM claim_events
                 WHERE block >= ?1 AND block <= ?2
                   AND (?3 IS NULL OR owner = ?3)
                   AND (?4 IS NULL OR fingerprint = ?4)
                 ORDER BY block ASC, log_index ASC",
            )?;

            let rows = stmt
                .query_map(
                    params![from as i64, to as i64, owner, fingerprint],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                        ))
                    },
                )?
                .collect::<std::result::Result<Vec<EventRow>, _>>()?;

            rows.into_iter().map(row_to_event).collect()
        })
        .await
    }

    async fn head_block(&self) -> Result<u64> {
        self.blocking(|conn| {
            let head: i64 = conn.query_row(
                "SELECT COALESCE(MAX(block), 0) FROM claim_events",
                [],
                |row| row.get(0),
            )?;
            Ok(head as u64)
        })
        .await
    }

    async fn claim_count(&self) -> Result<u64> {
        self.blocking(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM claims", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofcreate_core::{Keypair, UnsignedClaim};
    use tempfile::TempDir;

    fn fp(b: u8) -> Fingerprint {
        Fingerprint::from_bytes([b; 32])
    }

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    #[tokio::test]
    async fn test_sqlite_commit_and_read() {
        let store = SqliteChainStore::open_memory().unwrap();
        assert!(!store.claim_record(&fp(1)).await.unwrap().exists);

        let committed = store
            .commit_claim(&TxHash::hash(b"a"), &fp(1), &addr(4), 1_700_000_123)
            .await
            .unwrap();
        assert!(matches!(committed, CommitResult::Committed(ref e) if e.block == 1));

        let record = store.claim_record(&fp(1)).await.unwrap();
        assert_eq!(record, ClaimRecord::present(addr(4), 1_700_000_123));
    }

    #[tokio::test]
    async fn test_sqlite_duplicate_commit() {
        let store = SqliteChainStore::open_memory().unwrap();
        store
            .commit_claim(&TxHash::hash(b"a"), &fp(1), &addr(1), 5)
            .await
            .unwrap();
        let again = store
            .commit_claim(&TxHash::hash(b"b"), &fp(1), &addr(2), 6)
            .await
            .unwrap();

        assert_eq!(
            again,
            CommitResult::AlreadyClaimed(Claim {
                fingerprint: fp(1),
                owner: addr(1),
                timestamp: 5,
            })
        );
        assert_eq!(store.claim_count().await.unwrap(), 1);
        assert_eq!(store.head_block().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_events_ordered_and_filtered() {
        let store = SqliteChainStore::open_memory().unwrap();
        for (i, owner) in [2u8, 1, 2, 2].iter().enumerate() {
            store
                .commit_claim(
                    &TxHash::hash(&[i as u8]),
                    &fp(i as u8),
                    &addr(*owner),
                    100 + i as u64,
                )
                .await
                .unwrap();
        }

        let all = store.events(&EventFilter::all(), 0, 10).await.unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].position() < w[1].position()));

        let theirs = store
            .events(&EventFilter::by_owner(addr(2)), 0, 10)
            .await
            .unwrap();
        let blocks: Vec<u64> = theirs.iter().map(|e| e.block).collect();
        assert_eq!(blocks, vec![1, 3, 4]);

        let one = store
            .events(&EventFilter::by_fingerprint(fp(1)), 0, 10)
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].owner, addr(1));
    }

    #[tokio::test]
    async fn test_sqlite_pending_roundtrip() {
        let store = SqliteChainStore::open_memory().unwrap();
        let keypair = Keypair::from_seed(&[8; 32]);
        let tx = ClaimTransaction::sign(UnsignedClaim::new(fp(9), keypair.public_key()), &keypair);

        let hash = store.insert_pending(&tx).await.unwrap();
        store.insert_pending(&tx).await.unwrap();

        let taken = store.take_pending(&hash).await.unwrap().unwrap();
        assert_eq!(taken, tx);
        taken.verify().unwrap();
        assert!(store.take_pending(&hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain.db");

        {
            let store = SqliteChainStore::open(&path).unwrap();
            store
                .commit_claim(&TxHash::hash(b"x"), &fp(3), &addr(3), 42)
                .await
                .unwrap();
        }

        let store = SqliteChainStore::open(&path).unwrap();
        assert_eq!(
            store.claim_record(&fp(3)).await.unwrap(),
            ClaimRecord::present(addr(3), 42)
        );
        assert_eq!(store.head_block().await.unwrap(), 1);
    }
}
