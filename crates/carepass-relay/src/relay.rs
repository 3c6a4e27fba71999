//! The Relay: unified API for consent-gated record sharing.
//!
//! The relay brings together the ephemeral store, token service, and
//! report log into one facade. A patient device publishes payloads
//! under short share codes; a clinician device redeems the codes. The
//! two devices never talk directly, and nothing outlives its TTL.

use std::sync::Arc;

use carepass_auth::{AuthError, BearerToken, TokenService, VerifiedToken};
use carepass_core::clock::SharedClock;
use carepass_core::code::{CodePrefix, ShareCode};
use carepass_core::entity::{AccessGrant, RecordBundle};
use carepass_core::payload::{
    AccessGrantPayload, RecordBundlePayload, RelayPayload, TelemetryReport,
};
use carepass_core::types::SubjectRole;
use carepass_store::{EphemeralStore, InsertOutcome, Lookup, Sweeper};
use serde::Serialize;

use crate::config::{RedemptionPolicy, RelayConfig};
use crate::error::{RelayError, Result};
use crate::report::{ReceivedReport, ReportLog, REPORT_CAPACITY};

/// Liveness probe response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub uptime_millis: i64,
}

/// The main relay struct.
///
/// Every operation except token issuing, report intake, and the health
/// probe verifies the caller's bearer token before doing anything else.
pub struct Relay<S: EphemeralStore> {
    /// The storage backend.
    store: Arc<S>,
    /// Bearer token issuing and verification.
    tokens: TokenService<S>,
    /// Client diagnostics buffer.
    reports: ReportLog,
    /// Shared time source.
    clock: SharedClock,
    /// Configuration.
    config: RelayConfig,
    /// When this relay instance came up.
    started_at: i64,
}

impl<S: EphemeralStore> Relay<S> {
    /// Create a new relay instance.
    pub fn new(store: S, clock: SharedClock, config: RelayConfig) -> Self {
        let store = Arc::new(store);
        let tokens = TokenService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            &config.signing_secret,
            config.token_lifetime_millis,
        );
        let reports = ReportLog::new(Arc::clone(&clock), REPORT_CAPACITY);
        let started_at = clock.now_millis();

        Self {
            store,
            tokens,
            reports,
            clock,
            config,
            started_at,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the active configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────────────────

    /// Exchange a role's access key for a bearer token.
    pub async fn issue_token(&self, role: SubjectRole, access_key: &str) -> Result<BearerToken> {
        let expected = match role {
            SubjectRole::Patient => &self.config.patient_access_key,
            SubjectRole::Clinician => &self.config.clinician_access_key,
        };
        if !access_key_matches(expected, access_key) {
            tracing::warn!(role = %role, "token request with wrong access key");
            return Err(RelayError::InvalidCredentials);
        }

        let token = self.tokens.issue(role);
        tracing::info!(role = %role, "issued bearer token");
        Ok(token)
    }

    /// End the session behind a token.
    ///
    /// A second logout with the same token is a success, not an error.
    pub async fn logout(&self, token: &str) -> Result<()> {
        match self.tokens.verify(token).await {
            Ok(verified) => {
                self.tokens
                    .revoke(verified.token_id, verified.expires_at)
                    .await?;
                tracing::info!(role = %verified.role, "session ended");
                Ok(())
            }
            Err(AuthError::Revoked) => Ok(()),
            Err(other) => Err(other.into()),
        }
    }

    async fn authorize(&self, token: &str) -> Result<VerifiedToken> {
        Ok(self.tokens.verify(token).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Record Bundles
    // ─────────────────────────────────────────────────────────────────────────

    /// Publish one record under a fresh `REC-` share code.
    pub async fn publish_bundle(
        &self,
        token: &str,
        payload: RecordBundlePayload,
    ) -> Result<ShareCode> {
        self.authorize(token).await?;

        if payload.record.id.trim().is_empty() {
            return Err(RelayError::Validation("record id is required".into()));
        }

        let bytes = RelayPayload::RecordBundle(payload).to_bytes();
        let now = self.clock.now_millis();

        // Codes are drawn from a 32^7 space; colliding with a live code
        // is retried with a fresh draw.
        loop {
            let code = ShareCode::generate(CodePrefix::Record);
            let bundle =
                RecordBundle::new(code.clone(), bytes.clone(), now, self.config.bundle_ttl_millis);
            match self.store.put_bundle(bundle).await? {
                InsertOutcome::Inserted => {
                    tracing::info!(code = %code, "published record bundle");
                    return Ok(code);
                }
                InsertOutcome::CodeInUse => continue,
            }
        }
    }

    /// Redeem a `REC-` share code for its record.
    ///
    /// Under the default multi-read policy the code stays live until it
    /// expires; under single-use the first successful redemption
    /// consumes it and concurrent redeemers see exactly one winner.
    pub async fn redeem_bundle(
        &self,
        token: &str,
        code: &ShareCode,
    ) -> Result<RecordBundlePayload> {
        self.authorize(token).await?;

        let lookup = match self.config.redemption_policy {
            RedemptionPolicy::MultiRead => self.store.get_bundle(code).await?,
            RedemptionPolicy::SingleUse => self.store.take_bundle(code).await?,
        };
        let bundle = match lookup {
            Lookup::Found(bundle) => bundle,
            Lookup::Expired => return Err(RelayError::Expired),
            Lookup::Missing => return Err(RelayError::NotFound),
        };

        let payload = RelayPayload::from_bytes(&bundle.payload)?.into_record_bundle()?;
        tracing::info!(code = %code, "redeemed record bundle");
        Ok(payload)
    }

    /// Withdraw a published bundle before it expires.
    pub async fn delete_bundle(&self, token: &str, code: &ShareCode) -> Result<()> {
        self.authorize(token).await?;

        if self.store.delete_bundle(code).await? {
            tracing::info!(code = %code, "bundle deleted by publisher");
            Ok(())
        } else {
            Err(RelayError::NotFound)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access Grants
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant timeline access under a fresh `PAT-` code.
    ///
    /// The duration is the caller's requested minutes, defaulted from
    /// config when absent and capped at the configured maximum. The
    /// stored payload's `expires_in_secs` is rewritten to the enforced
    /// window so the recipient never sees a number the relay did not
    /// honor.
    pub async fn create_grant(
        &self,
        token: &str,
        payload: AccessGrantPayload,
        duration_minutes: Option<u32>,
    ) -> Result<ShareCode> {
        self.authorize(token).await?;

        let requested = duration_minutes.unwrap_or(self.config.default_grant_minutes);
        if requested == 0 {
            return Err(RelayError::Validation(
                "grant duration must be at least one minute".into(),
            ));
        }
        let minutes = requested.min(self.config.max_grant_minutes);

        let mut payload = payload;
        payload.expires_in_secs = u64::from(minutes) * 60;

        let bytes = RelayPayload::AccessGrant(Box::new(payload)).to_bytes();
        let ttl_millis = i64::from(minutes) * 60_000;
        let now = self.clock.now_millis();

        loop {
            let code = ShareCode::generate(CodePrefix::Grant);
            let grant = AccessGrant::new(code.clone(), bytes.clone(), now, ttl_millis);
            match self.store.put_grant(grant).await? {
                InsertOutcome::Inserted => {
                    tracing::info!(code = %code, minutes, "created access grant");
                    return Ok(code);
                }
                InsertOutcome::CodeInUse => continue,
            }
        }
    }

    /// Read the timeline behind a `PAT-` code.
    pub async fn read_grant(&self, token: &str, code: &ShareCode) -> Result<AccessGrantPayload> {
        self.authorize(token).await?;

        let grant = match self.store.get_grant(code).await? {
            Lookup::Found(grant) => grant,
            Lookup::Expired => return Err(RelayError::SessionExpired),
            Lookup::Missing => return Err(RelayError::NotFound),
        };

        let payload = RelayPayload::from_bytes(&grant.payload)?.into_access_grant()?;
        tracing::info!(code = %code, "access grant read");
        Ok(payload)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Diagnostics
    // ─────────────────────────────────────────────────────────────────────────

    /// Accept a client telemetry report. Unauthenticated; the channel
    /// carries no clinical data.
    pub fn submit_report(&self, report: TelemetryReport) -> ShareCode {
        self.reports.submit(report)
    }

    /// Retained reports, newest first.
    pub fn recent_reports(&self) -> Vec<ReceivedReport> {
        self.reports.recent()
    }

    /// Liveness probe. Touches no storage.
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok",
            uptime_millis: self.clock.now_millis() - self.started_at,
        }
    }

    /// Start the background sweeper at the configured interval.
    pub fn spawn_sweeper(&self) -> Sweeper
    where
        S: 'static,
    {
        Sweeper::spawn(Arc::clone(&self.store), self.config.sweep_interval)
    }
}

/// Compare an access key in constant time via hash equality.
fn access_key_matches(expected: &str, presented: &str) -> bool {
    blake3::hash(expected.as_bytes()) == blake3::hash(presented.as_bytes())
}
