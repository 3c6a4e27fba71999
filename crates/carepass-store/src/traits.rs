//! Store trait: the abstract interface for ephemeral persistence.
//!
//! The relay is storage-agnostic: everything it keeps lives behind
//! [`EphemeralStore`]. Implementations hold an injected clock and apply the
//! lazy expiry rule themselves, so no caller can observe an expired entity
//! as live regardless of whether the background sweep has run.

use async_trait::async_trait;
use std::fmt;

use carepass_core::{AccessGrant, RecordBundle, RevokedTokenMarker, ShareCode, TokenId};

use crate::error::Result;

/// Result of looking up a keyed entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// The entity exists and is unexpired.
    Found(T),
    /// The key exists but its TTL has elapsed.
    ///
    /// For grants this lookup has already flipped the stored status to
    /// `EXPIRED` as a side effect. For bundles the row may or may not still
    /// be present; it will never be returned again.
    Expired,
    /// No such key.
    Missing,
}

impl<T> Lookup<T> {
    /// The found value, if any.
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            _ => None,
        }
    }
}

/// Result of inserting a keyed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The entity was stored under its code.
    Inserted,
    /// A live entity already occupies this code. The caller generates a
    /// fresh code and retries; codes are never reused while live.
    CodeInUse,
}

/// Counters from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired bundles deleted.
    pub bundles_removed: usize,
    /// ACTIVE grants past expiry flipped to EXPIRED (rows retained).
    pub grants_expired: usize,
    /// Revocation markers past their token's natural expiry deleted.
    pub markers_removed: usize,
    /// Collection passes that failed and were skipped over.
    pub errors: usize,
}

impl SweepReport {
    /// Whether this pass changed or failed anything worth logging.
    pub fn is_quiet(&self) -> bool {
        *self == SweepReport::default()
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bundles_removed={} grants_expired={} markers_removed={} errors={}",
            self.bundles_removed, self.grants_expired, self.markers_removed, self.errors
        )
    }
}

/// The store trait: async interface over the three ephemeral collections
/// (record bundles, access grants, revoked-token markers).
///
/// # Semantics
///
/// - **Lazy expiry**: every lookup checks `now >= expires_at` against the
///   implementation's injected clock before answering. Expired bundles
///   answer [`Lookup::Expired`]; expired grants additionally transition
///   their stored status to `EXPIRED` (never back).
/// - **Per-key linearizability**: operations on the same code are
///   serialized. [`EphemeralStore::take_bundle`] performs lookup, expiry
///   check and removal in one critical section, so concurrent takers of
///   the same code produce exactly one winner.
/// - **No cross-collection coupling**: the three collections are
///   independent; a sweep failure in one must not abort the others.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Bundle Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a bundle under its code.
    ///
    /// Returns [`InsertOutcome::CodeInUse`] if an unexpired bundle already
    /// occupies the code. An expired leftover at the same code is
    /// overwritten; it was already unobservable.
    async fn put_bundle(&self, bundle: RecordBundle) -> Result<InsertOutcome>;

    /// Look up a bundle without consuming it (multi-read redemption).
    async fn get_bundle(&self, code: &ShareCode) -> Result<Lookup<RecordBundle>>;

    /// Atomically look up and remove a bundle (single-use redemption).
    async fn take_bundle(&self, code: &ShareCode) -> Result<Lookup<RecordBundle>>;

    /// Delete a bundle outright. Returns whether a row existed.
    async fn delete_bundle(&self, code: &ShareCode) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Grant Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a grant under its code.
    async fn put_grant(&self, grant: AccessGrant) -> Result<InsertOutcome>;

    /// Look up a grant.
    ///
    /// An ACTIVE grant past expiry is flipped to `EXPIRED` in storage as a
    /// side effect of this call, then reported as [`Lookup::Expired`].
    /// Grants are never deleted by reads or sweeps; an expired grant keeps
    /// answering `Expired` for audit purposes.
    async fn get_grant(&self, code: &ShareCode) -> Result<Lookup<AccessGrant>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Revocation Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a revoked token. Idempotent: re-inserting an already revoked
    /// id is a no-op success.
    async fn insert_revocation(&self, marker: RevokedTokenMarker) -> Result<()>;

    /// Whether a token id is in the revocation set.
    ///
    /// Hot path: consulted on every authenticated request. Implementations
    /// favor concurrent reads.
    async fn is_revoked(&self, token_id: &TokenId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Sweep
    // ─────────────────────────────────────────────────────────────────────────

    /// One active-expiry pass over all three collections.
    ///
    /// Deletes expired bundles and expired revocation markers, flips
    /// expired ACTIVE grants to EXPIRED. A failure in one collection is
    /// counted in [`SweepReport::errors`] and must not prevent sweeping
    /// the remaining collections.
    async fn sweep(&self) -> Result<SweepReport>;
}
