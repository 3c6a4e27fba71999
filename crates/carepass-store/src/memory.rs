//! In-memory implementation of the store trait.
//!
//! The reference backend, and the one tests reach for. Same observable
//! semantics as SQLite but nothing survives drop. Thread-safe via RwLock;
//! the write guard doubles as the per-key critical section, so a take is
//! atomic with respect to every other mutation.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use carepass_core::{
    AccessGrant, GrantStatus, RecordBundle, RevokedTokenMarker, ShareCode, SharedClock, TokenId,
};

use crate::error::Result;
use crate::traits::{EphemeralStore, InsertOutcome, Lookup, SweepReport};

/// In-memory store over the three ephemeral collections.
pub struct MemoryStore {
    clock: SharedClock,
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Record bundles by code.
    bundles: HashMap<ShareCode, RecordBundle>,

    /// Access grants by code. Expired grants stay here with EXPIRED status.
    grants: HashMap<ShareCode, AccessGrant>,

    /// Revoked-token markers by token id.
    revocations: HashMap<TokenId, RevokedTokenMarker>,
}

impl MemoryStore {
    /// Create an empty store reading time from `clock`.
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            inner: RwLock::new(MemoryStoreInner {
                bundles: HashMap::new(),
                grants: HashMap::new(),
                revocations: HashMap::new(),
            }),
        }
    }

    /// Stored status of a grant, bypassing the lazy-expiry flip.
    ///
    /// Inspection helper for tests that assert on the persisted status
    /// rather than the lookup result.
    pub fn grant_status(&self, code: &ShareCode) -> Option<GrantStatus> {
        let inner = self.inner.read().unwrap();
        inner.grants.get(code).map(|g| g.status)
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn put_bundle(&self, bundle: RecordBundle) -> Result<InsertOutcome> {
        let now = self.clock.now_millis();
        let mut inner = self.inner.write().unwrap();

        if let Some(existing) = inner.bundles.get(&bundle.code) {
            if !existing.is_expired(now) {
                return Ok(InsertOutcome::CodeInUse);
            }
            // An expired leftover is unobservable; the new bundle may
            // take its code.
        }

        inner.bundles.insert(bundle.code.clone(), bundle);
        Ok(InsertOutcome::Inserted)
    }

    async fn get_bundle(&self, code: &ShareCode) -> Result<Lookup<RecordBundle>> {
        let now = self.clock.now_millis();
        let inner = self.inner.read().unwrap();

        match inner.bundles.get(code) {
            Some(bundle) if bundle.is_expired(now) => Ok(Lookup::Expired),
            Some(bundle) => Ok(Lookup::Found(bundle.clone())),
            None => Ok(Lookup::Missing),
        }
    }

    async fn take_bundle(&self, code: &ShareCode) -> Result<Lookup<RecordBundle>> {
        let now = self.clock.now_millis();
        let mut inner = self.inner.write().unwrap();

        match inner.bundles.get(code) {
            Some(bundle) if bundle.is_expired(now) => Ok(Lookup::Expired),
            Some(_) => {
                let bundle = inner.bundles.remove(code).expect("checked above");
                Ok(Lookup::Found(bundle))
            }
            None => Ok(Lookup::Missing),
        }
    }

    async fn delete_bundle(&self, code: &ShareCode) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.bundles.remove(code).is_some())
    }

    async fn put_grant(&self, grant: AccessGrant) -> Result<InsertOutcome> {
        let mut inner = self.inner.write().unwrap();

        // Expired grants are retained for audit, so any occupant blocks
        // the code, unlike bundles.
        if inner.grants.contains_key(&grant.code) {
            return Ok(InsertOutcome::CodeInUse);
        }

        inner.grants.insert(grant.code.clone(), grant);
        Ok(InsertOutcome::Inserted)
    }

    async fn get_grant(&self, code: &ShareCode) -> Result<Lookup<AccessGrant>> {
        let now = self.clock.now_millis();
        let mut inner = self.inner.write().unwrap();

        match inner.grants.get_mut(code) {
            Some(grant) if grant.is_expired(now) => {
                grant.expire();
                Ok(Lookup::Expired)
            }
            Some(grant) if !grant.status.is_active() => Ok(Lookup::Expired),
            Some(grant) => Ok(Lookup::Found(grant.clone())),
            None => Ok(Lookup::Missing),
        }
    }

    async fn insert_revocation(&self, marker: RevokedTokenMarker) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.revocations.entry(marker.token_id).or_insert(marker);
        Ok(())
    }

    async fn is_revoked(&self, token_id: &TokenId) -> Result<bool> {
        let inner = self.inner.read().unwrap();
        Ok(inner.revocations.contains_key(token_id))
    }

    async fn sweep(&self) -> Result<SweepReport> {
        let now = self.clock.now_millis();
        let mut inner = self.inner.write().unwrap();
        let mut report = SweepReport::default();

        let before = inner.bundles.len();
        inner.bundles.retain(|_, b| !b.is_expired(now));
        report.bundles_removed = before - inner.bundles.len();

        for grant in inner.grants.values_mut() {
            if grant.status.is_active() && grant.is_expired(now) {
                grant.expire();
                report.grants_expired += 1;
            }
        }

        let before = inner.revocations.len();
        inner.revocations.retain(|_, m| !m.is_expired(now));
        report.markers_removed = before - inner.revocations.len();

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use carepass_core::{CodePrefix, ManualClock};
    use std::sync::Arc;

    fn store_at(now: i64) -> (ManualClock, MemoryStore) {
        let clock = ManualClock::new(now);
        let store = MemoryStore::new(clock.shared());
        (clock, store)
    }

    fn bundle(code: &ShareCode, created_at: i64, ttl: i64) -> RecordBundle {
        RecordBundle::new(code.clone(), Bytes::from_static(b"payload"), created_at, ttl)
    }

    fn grant(code: &ShareCode, created_at: i64, ttl: i64) -> AccessGrant {
        AccessGrant::new(code.clone(), Bytes::from_static(b"payload"), created_at, ttl)
    }

    #[tokio::test]
    async fn test_bundle_put_get_roundtrip() {
        let (_clock, store) = store_at(1_000);
        let code = ShareCode::generate(CodePrefix::Record);

        let outcome = store.put_bundle(bundle(&code, 1_000, 500)).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);

        let found = store.get_bundle(&code).await.unwrap().found().unwrap();
        assert_eq!(found.code, code);
        assert_eq!(found.expires_at, 1_500);
    }

    #[tokio::test]
    async fn test_bundle_lazy_expiry_without_sweep() {
        let (clock, store) = store_at(1_000);
        let code = ShareCode::generate(CodePrefix::Record);
        store.put_bundle(bundle(&code, 1_000, 500)).await.unwrap();

        clock.set(1_499);
        assert!(matches!(
            store.get_bundle(&code).await.unwrap(),
            Lookup::Found(_)
        ));

        clock.set(1_500);
        assert_eq!(store.get_bundle(&code).await.unwrap(), Lookup::Expired);

        // Still expired on repeat reads until the sweep collects it.
        assert_eq!(store.get_bundle(&code).await.unwrap(), Lookup::Expired);
        store.sweep().await.unwrap();
        assert_eq!(store.get_bundle(&code).await.unwrap(), Lookup::Missing);
    }

    #[tokio::test]
    async fn test_live_code_cannot_be_reused() {
        let (_clock, store) = store_at(0);
        let code = ShareCode::generate(CodePrefix::Record);
        store.put_bundle(bundle(&code, 0, 100)).await.unwrap();

        let outcome = store.put_bundle(bundle(&code, 0, 100)).await.unwrap();
        assert_eq!(outcome, InsertOutcome::CodeInUse);
    }

    #[tokio::test]
    async fn test_expired_bundle_code_can_be_reused() {
        let (clock, store) = store_at(0);
        let code = ShareCode::generate(CodePrefix::Record);
        store.put_bundle(bundle(&code, 0, 100)).await.unwrap();

        clock.set(100);
        let outcome = store.put_bundle(bundle(&code, 100, 100)).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);
        assert!(matches!(
            store.get_bundle(&code).await.unwrap(),
            Lookup::Found(_)
        ));
    }

    #[tokio::test]
    async fn test_take_bundle_consumes() {
        let (_clock, store) = store_at(0);
        let code = ShareCode::generate(CodePrefix::Record);
        store.put_bundle(bundle(&code, 0, 100)).await.unwrap();

        assert!(matches!(
            store.take_bundle(&code).await.unwrap(),
            Lookup::Found(_)
        ));
        assert_eq!(store.take_bundle(&code).await.unwrap(), Lookup::Missing);
        assert_eq!(store.get_bundle(&code).await.unwrap(), Lookup::Missing);
    }

    #[tokio::test]
    async fn test_concurrent_takes_have_one_winner() {
        let (_clock, store) = store_at(0);
        let store = Arc::new(store);
        let code = ShareCode::generate(CodePrefix::Record);
        store.put_bundle(bundle(&code, 0, 10_000)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let code = code.clone();
            handles.push(tokio::spawn(async move {
                matches!(store.take_bundle(&code).await.unwrap(), Lookup::Found(_))
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_delete_bundle_reports_presence() {
        let (_clock, store) = store_at(0);
        let code = ShareCode::generate(CodePrefix::Record);
        store.put_bundle(bundle(&code, 0, 100)).await.unwrap();

        assert!(store.delete_bundle(&code).await.unwrap());
        assert!(!store.delete_bundle(&code).await.unwrap());
    }

    #[tokio::test]
    async fn test_grant_flips_to_expired_on_read() {
        let (clock, store) = store_at(0);
        let code = ShareCode::generate(CodePrefix::Grant);
        store.put_grant(grant(&code, 0, 1_000)).await.unwrap();

        assert_eq!(store.grant_status(&code), Some(GrantStatus::Active));

        clock.set(1_000);
        assert_eq!(store.get_grant(&code).await.unwrap(), Lookup::Expired);
        assert_eq!(store.grant_status(&code), Some(GrantStatus::Expired));

        // Retained, never deleted; keeps answering Expired.
        store.sweep().await.unwrap();
        assert_eq!(store.get_grant(&code).await.unwrap(), Lookup::Expired);
    }

    #[tokio::test]
    async fn test_expired_grant_code_stays_occupied() {
        let (clock, store) = store_at(0);
        let code = ShareCode::generate(CodePrefix::Grant);
        store.put_grant(grant(&code, 0, 100)).await.unwrap();

        clock.set(500);
        store.sweep().await.unwrap();
        let outcome = store.put_grant(grant(&code, 500, 100)).await.unwrap();
        assert_eq!(outcome, InsertOutcome::CodeInUse);
    }

    #[tokio::test]
    async fn test_revocation_idempotent() {
        let (_clock, store) = store_at(0);
        let id = TokenId::generate();

        assert!(!store.is_revoked(&id).await.unwrap());
        store
            .insert_revocation(RevokedTokenMarker::new(id, 10_000))
            .await
            .unwrap();
        assert!(store.is_revoked(&id).await.unwrap());

        // Second revocation of the same id is a no-op success.
        store
            .insert_revocation(RevokedTokenMarker::new(id, 10_000))
            .await
            .unwrap();
        assert!(store.is_revoked(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_counts_and_isolation() {
        let (clock, store) = store_at(0);
        let bundle_code = ShareCode::generate(CodePrefix::Record);
        let keep_code = ShareCode::generate(CodePrefix::Record);
        let grant_code = ShareCode::generate(CodePrefix::Grant);
        let token = TokenId::generate();

        store.put_bundle(bundle(&bundle_code, 0, 100)).await.unwrap();
        store.put_bundle(bundle(&keep_code, 0, 10_000)).await.unwrap();
        store.put_grant(grant(&grant_code, 0, 100)).await.unwrap();
        store
            .insert_revocation(RevokedTokenMarker::new(token, 100))
            .await
            .unwrap();

        clock.set(200);
        let report = store.sweep().await.unwrap();
        assert_eq!(report.bundles_removed, 1);
        assert_eq!(report.grants_expired, 1);
        assert_eq!(report.markers_removed, 1);
        assert_eq!(report.errors, 0);

        // Unexpired bundle survived; second pass finds nothing to do.
        assert!(matches!(
            store.get_bundle(&keep_code).await.unwrap(),
            Lookup::Found(_)
        ));
        assert!(store.sweep().await.unwrap().is_quiet());
    }

    #[tokio::test]
    async fn test_sweep_does_not_recount_flipped_grants() {
        let (clock, store) = store_at(0);
        let code = ShareCode::generate(CodePrefix::Grant);
        store.put_grant(grant(&code, 0, 100)).await.unwrap();

        clock.set(200);
        // Read-time discovery flips first; the sweep then sees a grant
        // that is already EXPIRED.
        assert_eq!(store.get_grant(&code).await.unwrap(), Lookup::Expired);
        let report = store.sweep().await.unwrap();
        assert_eq!(report.grants_expired, 0);
    }
}
