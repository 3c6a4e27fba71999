//! Versioned SQLite schema for the three ephemeral collections.
//!
//! Applied batches are recorded in `schema_migrations`, so reopening an
//! existing database only runs what is missing. The caller supplies the
//! timestamp so the store's single clock also stamps `applied_at`.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Schema version this build expects.
pub const CURRENT_VERSION: u32 = 1;

/// Bring the schema up to [`CURRENT_VERSION`]. Safe to call repeatedly.
pub fn migrate(conn: &mut Connection, now_millis: i64) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let applied: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    if applied >= CURRENT_VERSION {
        return Ok(());
    }

    // All missing versions land in one transaction; a failure partway
    // leaves the recorded version consistent with the actual schema.
    let tx = conn.transaction()?;
    for version in (applied + 1)..=CURRENT_VERSION {
        tx.execute_batch(batch_for(version)?)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![version, now_millis],
        )?;
    }
    tx.commit()?;

    Ok(())
}

fn batch_for(version: u32) -> Result<&'static str> {
    match version {
        1 => Ok(V1_COLLECTIONS),
        other => Err(StoreError::Migration(format!(
            "no migration defined for version {other}"
        ))),
    }
}

/// v1: the bundle, grant, and revocation collections.
const V1_COLLECTIONS: &str = r#"
    -- Record bundles awaiting redemption. Deleted on expiry.
    CREATE TABLE bundles (
        code TEXT PRIMARY KEY,            -- share code, e.g. REC-7KQM-W4H
        payload BLOB NOT NULL,            -- opaque CBOR payload bytes
        created_at INTEGER NOT NULL,      -- Unix ms
        expires_at INTEGER NOT NULL       -- Unix ms
    );

    -- Access grants. Expired rows are retained with status EXPIRED.
    CREATE TABLE grants (
        code TEXT PRIMARY KEY,            -- share code, e.g. PAT-7KQM-W4H
        payload BLOB NOT NULL,            -- opaque CBOR payload bytes
        status TEXT NOT NULL,             -- ACTIVE or EXPIRED
        created_at INTEGER NOT NULL,
        expires_at INTEGER NOT NULL
    );

    -- Revoked bearer tokens, kept until the token's natural expiry.
    CREATE TABLE revoked_tokens (
        token_id BLOB PRIMARY KEY,        -- 16 bytes
        expires_at INTEGER NOT NULL
    );

    -- Expiry scans for the sweep
    CREATE INDEX idx_bundles_expires ON bundles(expires_at);
    CREATE INDEX idx_grants_status_expires ON grants(status, expires_at);
    CREATE INDEX idx_revoked_expires ON revoked_tokens(expires_at);
"#;
