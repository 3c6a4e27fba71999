//! SQLite implementation of the store trait.
//!
//! The durable single-node backend. Uses rusqlite with bundled SQLite,
//! wrapped in async via `tokio::task::spawn_blocking`. The connection
//! mutex serializes all statements, which is what makes check-then-write
//! sequences like `take_bundle` atomic with respect to other callers.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use carepass_core::{
    AccessGrant, GrantStatus, RecordBundle, RevokedTokenMarker, ShareCode, SharedClock, TokenId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{EphemeralStore, InsertOutcome, Lookup, SweepReport};

/// SQLite-backed store over the three ephemeral collections.
pub struct SqliteStore {
    clock: SharedClock,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations as needed.
    pub fn open(path: impl AsRef<Path>, clock: SharedClock) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn, clock.now_millis())?;
        Ok(Self {
            clock,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory(clock: SharedClock) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn, clock.now_millis())?;
        Ok(Self {
            clock,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking thread pool.
    ///
    /// The mutex is held for the whole closure, so multi-statement
    /// sequences inside one call cannot interleave with other callers.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::TaskJoin(e.to_string()))?
    }
}

fn row_to_bundle(row: &rusqlite::Row<'_>) -> Result<RecordBundle> {
    let code: String = row.get("code").map_err(StoreError::from)?;
    let payload: Vec<u8> = row.get("payload").map_err(StoreError::from)?;
    Ok(RecordBundle {
        code: ShareCode::parse(&code).map_err(|e| StoreError::InvalidData(e.to_string()))?,
        payload: Bytes::from(payload),
        created_at: row.get("created_at").map_err(StoreError::from)?,
        expires_at: row.get("expires_at").map_err(StoreError::from)?,
    })
}

fn row_to_grant(row: &rusqlite::Row<'_>) -> Result<AccessGrant> {
    let code: String = row.get("code").map_err(StoreError::from)?;
    let payload: Vec<u8> = row.get("payload").map_err(StoreError::from)?;
    let status: String = row.get("status").map_err(StoreError::from)?;
    let status = match status.as_str() {
        "ACTIVE" => GrantStatus::Active,
        "EXPIRED" => GrantStatus::Expired,
        other => {
            return Err(StoreError::InvalidData(format!(
                "unknown grant status: {other}"
            )))
        }
    };
    Ok(AccessGrant {
        code: ShareCode::parse(&code).map_err(|e| StoreError::InvalidData(e.to_string()))?,
        payload: Bytes::from(payload),
        status,
        created_at: row.get("created_at").map_err(StoreError::from)?,
        expires_at: row.get("expires_at").map_err(StoreError::from)?,
    })
}

#[async_trait]
impl EphemeralStore for SqliteStore {
    async fn put_bundle(&self, bundle: RecordBundle) -> Result<InsertOutcome> {
        let now = self.clock.now_millis();
        self.blocking(move |conn| {
            let live: Option<i64> = conn
                .query_row(
                    "SELECT expires_at FROM bundles WHERE code = ?1",
                    params![bundle.code.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(expires_at) = live {
                if now < expires_at {
                    return Ok(InsertOutcome::CodeInUse);
                }
            }

            conn.execute(
                "INSERT OR REPLACE INTO bundles (code, payload, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    bundle.code.as_str(),
                    bundle.payload.as_ref(),
                    bundle.created_at,
                    bundle.expires_at,
                ],
            )?;
            Ok(InsertOutcome::Inserted)
        })
        .await
    }

    async fn get_bundle(&self, code: &ShareCode) -> Result<Lookup<RecordBundle>> {
        let now = self.clock.now_millis();
        let code = code.clone();
        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    "SELECT code, payload, created_at, expires_at
                     FROM bundles WHERE code = ?1",
                    params![code.as_str()],
                    |row| Ok(row_to_bundle(row)),
                )
                .optional()?;

            match row {
                None => Ok(Lookup::Missing),
                Some(bundle) => {
                    let bundle = bundle?;
                    if bundle.is_expired(now) {
                        Ok(Lookup::Expired)
                    } else {
                        Ok(Lookup::Found(bundle))
                    }
                }
            }
        })
        .await
    }

    async fn take_bundle(&self, code: &ShareCode) -> Result<Lookup<RecordBundle>> {
        let now = self.clock.now_millis();
        let code = code.clone();
        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    "SELECT code, payload, created_at, expires_at
                     FROM bundles WHERE code = ?1",
                    params![code.as_str()],
                    |row| Ok(row_to_bundle(row)),
                )
                .optional()?;

            match row {
                None => Ok(Lookup::Missing),
                Some(bundle) => {
                    let bundle = bundle?;
                    if bundle.is_expired(now) {
                        return Ok(Lookup::Expired);
                    }
                    // The connection mutex is held across the whole
                    // closure, so nobody can race between the read above
                    // and this delete.
                    conn.execute(
                        "DELETE FROM bundles WHERE code = ?1",
                        params![code.as_str()],
                    )?;
                    Ok(Lookup::Found(bundle))
                }
            }
        })
        .await
    }

    async fn delete_bundle(&self, code: &ShareCode) -> Result<bool> {
        let code = code.clone();
        self.blocking(move |conn| {
            let changed = conn.execute(
                "DELETE FROM bundles WHERE code = ?1",
                params![code.as_str()],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn put_grant(&self, grant: AccessGrant) -> Result<InsertOutcome> {
        self.blocking(move |conn| {
            // Expired grants are retained for audit, so any occupant
            // blocks the code, unlike bundles.
            let occupied: Option<String> = conn
                .query_row(
                    "SELECT code FROM grants WHERE code = ?1",
                    params![grant.code.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            if occupied.is_some() {
                return Ok(InsertOutcome::CodeInUse);
            }

            conn.execute(
                "INSERT INTO grants (code, payload, status, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    grant.code.as_str(),
                    grant.payload.as_ref(),
                    grant.status.as_str(),
                    grant.created_at,
                    grant.expires_at,
                ],
            )?;
            Ok(InsertOutcome::Inserted)
        })
        .await
    }

    async fn get_grant(&self, code: &ShareCode) -> Result<Lookup<AccessGrant>> {
        let now = self.clock.now_millis();
        let code = code.clone();
        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    "SELECT code, payload, status, created_at, expires_at
                     FROM grants WHERE code = ?1",
                    params![code.as_str()],
                    |row| Ok(row_to_grant(row)),
                )
                .optional()?;

            match row {
                None => Ok(Lookup::Missing),
                Some(grant) => {
                    let grant = grant?;
                    if !grant.status.is_active() {
                        return Ok(Lookup::Expired);
                    }
                    if grant.is_expired(now) {
                        // Read-time discovery transitions the stored row.
                        conn.execute(
                            "UPDATE grants SET status = 'EXPIRED' WHERE code = ?1",
                            params![code.as_str()],
                        )?;
                        return Ok(Lookup::Expired);
                    }
                    Ok(Lookup::Found(grant))
                }
            }
        })
        .await
    }

    async fn insert_revocation(&self, marker: RevokedTokenMarker) -> Result<()> {
        self.blocking(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO revoked_tokens (token_id, expires_at)
                 VALUES (?1, ?2)",
                params![marker.token_id.as_bytes().as_slice(), marker.expires_at],
            )?;
            Ok(())
        })
        .await
    }

    async fn is_revoked(&self, token_id: &TokenId) -> Result<bool> {
        let token_id = *token_id;
        self.blocking(move |conn| {
            let present: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM revoked_tokens WHERE token_id = ?1",
                    params![token_id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(present.is_some())
        })
        .await
    }

    async fn sweep(&self) -> Result<SweepReport> {
        let now = self.clock.now_millis();
        self.blocking(move |conn| {
            let mut report = SweepReport::default();

            // Each collection is swept independently; a failure in one is
            // counted and the others still run.
            match conn.execute("DELETE FROM bundles WHERE expires_at <= ?1", params![now]) {
                Ok(n) => report.bundles_removed = n,
                Err(e) => {
                    tracing::warn!(error = %e, "bundle sweep failed");
                    report.errors += 1;
                }
            }

            match conn.execute(
                "UPDATE grants SET status = 'EXPIRED'
                 WHERE status = 'ACTIVE' AND expires_at <= ?1",
                params![now],
            ) {
                Ok(n) => report.grants_expired = n,
                Err(e) => {
                    tracing::warn!(error = %e, "grant sweep failed");
                    report.errors += 1;
                }
            }

            match conn.execute(
                "DELETE FROM revoked_tokens WHERE expires_at <= ?1",
                params![now],
            ) {
                Ok(n) => report.markers_removed = n,
                Err(e) => {
                    tracing::warn!(error = %e, "revocation sweep failed");
                    report.errors += 1;
                }
            }

            Ok(report)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carepass_core::{CodePrefix, ManualClock};

    fn store_at(now: i64) -> (ManualClock, SqliteStore) {
        let clock = ManualClock::new(now);
        let store = SqliteStore::open_memory(clock.shared()).unwrap();
        (clock, store)
    }

    fn bundle(code: &ShareCode, created_at: i64, ttl: i64) -> RecordBundle {
        RecordBundle::new(code.clone(), Bytes::from_static(b"payload"), created_at, ttl)
    }

    fn grant(code: &ShareCode, created_at: i64, ttl: i64) -> AccessGrant {
        AccessGrant::new(code.clone(), Bytes::from_static(b"payload"), created_at, ttl)
    }

    #[tokio::test]
    async fn test_bundle_roundtrip_and_lazy_expiry() {
        let (clock, store) = store_at(1_000);
        let code = ShareCode::generate(CodePrefix::Record);
        store.put_bundle(bundle(&code, 1_000, 500)).await.unwrap();

        let found = store.get_bundle(&code).await.unwrap().found().unwrap();
        assert_eq!(found.payload.as_ref(), b"payload");

        clock.set(1_500);
        assert_eq!(store.get_bundle(&code).await.unwrap(), Lookup::Expired);
        store.sweep().await.unwrap();
        assert_eq!(store.get_bundle(&code).await.unwrap(), Lookup::Missing);
    }

    #[tokio::test]
    async fn test_take_bundle_consumes_once() {
        let (_clock, store) = store_at(0);
        let code = ShareCode::generate(CodePrefix::Record);
        store.put_bundle(bundle(&code, 0, 100)).await.unwrap();

        assert!(matches!(
            store.take_bundle(&code).await.unwrap(),
            Lookup::Found(_)
        ));
        assert_eq!(store.take_bundle(&code).await.unwrap(), Lookup::Missing);
    }

    #[tokio::test]
    async fn test_live_code_collision_detected() {
        let (_clock, store) = store_at(0);
        let code = ShareCode::generate(CodePrefix::Record);
        store.put_bundle(bundle(&code, 0, 100)).await.unwrap();
        assert_eq!(
            store.put_bundle(bundle(&code, 0, 100)).await.unwrap(),
            InsertOutcome::CodeInUse
        );
    }

    #[tokio::test]
    async fn test_grant_flip_is_persisted() {
        let (clock, store) = store_at(0);
        let code = ShareCode::generate(CodePrefix::Grant);
        store.put_grant(grant(&code, 0, 1_000)).await.unwrap();

        clock.set(2_000);
        assert_eq!(store.get_grant(&code).await.unwrap(), Lookup::Expired);

        // Already flipped by the read; the sweep finds nothing ACTIVE.
        let report = store.sweep().await.unwrap();
        assert_eq!(report.grants_expired, 0);

        // Row retained for audit.
        assert_eq!(store.get_grant(&code).await.unwrap(), Lookup::Expired);
        assert_eq!(
            store.put_grant(grant(&code, 2_000, 100)).await.unwrap(),
            InsertOutcome::CodeInUse
        );
    }

    #[tokio::test]
    async fn test_revocation_idempotent_and_swept() {
        let (clock, store) = store_at(0);
        let id = TokenId::generate();
        store
            .insert_revocation(RevokedTokenMarker::new(id, 1_000))
            .await
            .unwrap();
        store
            .insert_revocation(RevokedTokenMarker::new(id, 1_000))
            .await
            .unwrap();
        assert!(store.is_revoked(&id).await.unwrap());

        clock.set(1_000);
        let report = store.sweep().await.unwrap();
        assert_eq!(report.markers_removed, 1);
        assert!(!store.is_revoked(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let clock = ManualClock::new(0);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.db");
        let code = ShareCode::generate(CodePrefix::Record);

        {
            let store = SqliteStore::open(&path, clock.shared()).unwrap();
            store.put_bundle(bundle(&code, 0, 10_000)).await.unwrap();
        }

        let store = SqliteStore::open(&path, clock.shared()).unwrap();
        let found = store.get_bundle(&code).await.unwrap().found().unwrap();
        assert_eq!(found.code, code);
    }
}
