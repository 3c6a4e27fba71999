//! Stored entities: what the ephemeral store holds for each collection.
//!
//! Three kinds exist, one per collection: record bundles, access grants,
//! and revoked-token markers. Each carries its own `expires_at`; there are
//! no references between collections.
//!
//! Payloads are kept as opaque CBOR bytes here. Decoding to the typed
//! schemas in [`crate::payload`] happens at the API boundary, not in
//! storage.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::code::ShareCode;
use crate::types::TokenId;

/// A published record bundle awaiting redemption.
///
/// Immutable after creation apart from deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBundle {
    pub code: ShareCode,
    pub payload: Bytes,
    pub created_at: i64,
    pub expires_at: i64,
}

impl RecordBundle {
    /// Create a bundle expiring `ttl_millis` after `created_at`.
    ///
    /// Callers validate `ttl_millis > 0`, which keeps the invariant
    /// `expires_at > created_at`.
    pub fn new(code: ShareCode, payload: Bytes, created_at: i64, ttl_millis: i64) -> Self {
        Self {
            code,
            payload,
            created_at,
            expires_at: created_at + ttl_millis,
        }
    }

    /// Whether this bundle is past its expiry at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Lifecycle status of an access grant.
///
/// The only transition is `Active` to `Expired`, taken when a read or the
/// sweep discovers `expires_at` has passed. `Expired` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantStatus {
    Active,
    Expired,
}

impl GrantStatus {
    pub const fn is_active(&self) -> bool {
        matches!(self, GrantStatus::Active)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            GrantStatus::Active => "ACTIVE",
            GrantStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A patient-authorized, time-bound session over a record set.
///
/// Unlike bundles, expired grants are retained with `EXPIRED` status so
/// that a later lookup can answer "this session ended" rather than "never
/// heard of it".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub code: ShareCode,
    pub payload: Bytes,
    pub status: GrantStatus,
    pub created_at: i64,
    pub expires_at: i64,
}

impl AccessGrant {
    /// Create an `ACTIVE` grant expiring `ttl_millis` after `created_at`.
    pub fn new(code: ShareCode, payload: Bytes, created_at: i64, ttl_millis: i64) -> Self {
        Self {
            code,
            payload,
            status: GrantStatus::Active,
            created_at,
            expires_at: created_at + ttl_millis,
        }
    }

    /// Whether this grant is past its expiry at `now`, regardless of the
    /// stored status.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Mark the grant expired. Idempotent; never reactivates.
    pub fn expire(&mut self) {
        self.status = GrantStatus::Expired;
    }
}

/// Marker recording that a bearer token was revoked before its natural
/// expiry. Kept only until the token itself would have expired anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokedTokenMarker {
    pub token_id: TokenId,
    pub expires_at: i64,
}

impl RevokedTokenMarker {
    pub fn new(token_id: TokenId, expires_at: i64) -> Self {
        Self {
            token_id,
            expires_at,
        }
    }

    /// Whether the revoked token is itself past expiry, making the marker
    /// collectable.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}
