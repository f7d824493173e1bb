//! Database schema migrations for the SQLite chain store.
//!
//! Each migration is a SQL batch that moves the schema from version N to
//! N+1. Applied versions are recorded in `schema_migrations`.

use rusqlite::{Connection, OptionalExtension};

use crate::error::{LedgerError, Result};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get::<_, Option<u32>>(0)
        })
        .optional()?
        .flatten()
        .unwrap_or(0);

    if current > CURRENT_VERSION {
        return Err(LedgerError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_secs()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "migrated chain schema");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(LedgerError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: claims, event log, pending pool.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per claimed fingerprint
        CREATE TABLE claims (
            fingerprint BLOB PRIMARY KEY,     -- 32 bytes, SHA-256 of content
            owner BLOB NOT NULL,              -- 20 bytes, claimant address
            timestamp INTEGER NOT NULL,       -- ledger time, seconds
            block INTEGER NOT NULL,
            tx_hash BLOB NOT NULL             -- 32 bytes, Blake3 of canonical tx
        );

        -- Append-only claim event log
        CREATE TABLE claim_events (
            block INTEGER NOT NULL,
            log_index INTEGER NOT NULL,
            fingerprint BLOB NOT NULL,
            owner BLOB NOT NULL,
            timestamp INTEGER NOT NULL,
            tx_hash BLOB NOT NULL,
            PRIMARY KEY (block, log_index)
        );

        -- Broadcast transactions awaiting confirmation
        CREATE TABLE pending_transactions (
            tx_hash BLOB PRIMARY KEY,
            fingerprint BLOB NOT NULL,
            tx_bytes BLOB NOT NULL,           -- canonical CBOR encoding
            submitted_at INTEGER NOT NULL
        );

        CREATE INDEX idx_claim_events_owner ON claim_events(owner);
        CREATE INDEX idx_claim_events_fingerprint ON claim_events(fingerprint);
        "#,
    )?;

    Ok(())
}

pub(crate) fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
