//! Token issuing, verification, and revocation.
//!
//! A token is the hex encoding of `claims || signature`, where the
//! signature is Ed25519 over the canonical claims bytes. The signing
//! key is derived from the configured secret, so every relay process
//! sharing a secret accepts each other's tokens.

use std::fmt;
use std::sync::Arc;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};

use carepass_core::clock::SharedClock;
use carepass_core::entity::RevokedTokenMarker;
use carepass_core::types::{SubjectRole, TokenId};
use carepass_store::EphemeralStore;

use crate::claims::{TokenClaims, TOKEN_VERSION};
use crate::error::{AuthError, Result};

/// Default bearer token lifetime: 12 hours.
pub const DEFAULT_TOKEN_LIFETIME_MILLIS: i64 = 12 * 60 * 60 * 1000;

/// Key derivation context for the token signing key.
const SIGNING_KEY_CONTEXT: &str = "carepass 2025-11-04 bearer token signing";

/// Ed25519 signature length in bytes.
const SIGNATURE_LEN: usize = 64;

/// A bearer token in wire form (lowercase hex).
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// The wire string a client presents back on later calls.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the wire string.
    pub fn into_string(self) -> String {
        self.0
    }
}

// Tokens are credentials; Debug shows a prefix only.
impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearerToken({}...)", &self.0[..self.0.len().min(8)])
    }
}

impl fmt::Display for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BearerToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The outcome of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    /// Role the bearer acts as.
    pub role: SubjectRole,
    /// Identifier used to revoke this token.
    pub token_id: TokenId,
    /// Natural expiry of the token (milliseconds since epoch).
    pub expires_at: i64,
}

/// Issues and verifies bearer tokens against an injected clock and the
/// store's revocation markers.
pub struct TokenService<S> {
    store: Arc<S>,
    clock: SharedClock,
    signing_key: SigningKey,
    lifetime_millis: i64,
}

impl<S: EphemeralStore> TokenService<S> {
    /// Create a service signing with a key derived from `signing_secret`.
    pub fn new(
        store: Arc<S>,
        clock: SharedClock,
        signing_secret: &str,
        lifetime_millis: i64,
    ) -> Self {
        let seed = blake3::derive_key(SIGNING_KEY_CONTEXT, signing_secret.as_bytes());
        Self {
            store,
            clock,
            signing_key: SigningKey::from_bytes(&seed),
            lifetime_millis,
        }
    }

    /// Mint a token for `role` expiring one lifetime from now.
    pub fn issue(&self, role: SubjectRole) -> BearerToken {
        let now = self.clock.now_millis();
        let claims = TokenClaims {
            version: TOKEN_VERSION,
            role,
            token_id: TokenId::generate(),
            issued_at: now,
            expires_at: now + self.lifetime_millis,
        };

        let mut wire = claims.signing_bytes();
        let signature = self.signing_key.sign(&wire);
        wire.extend_from_slice(&signature.to_bytes());
        BearerToken(hex::encode(wire))
    }

    /// Verify a presented token.
    ///
    /// Checks run in a fixed order: signature over the carried claims
    /// bytes, then claims decode, then expiry against the injected
    /// clock, then the revocation marker lookup. Expiry is decided
    /// here and nowhere else.
    pub async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let raw =
            hex::decode(token).map_err(|_| AuthError::Malformed("token is not hex".into()))?;
        if raw.len() <= SIGNATURE_LEN {
            return Err(AuthError::Malformed("token too short".into()));
        }

        let (claims_bytes, sig_bytes) = raw.split_at(raw.len() - SIGNATURE_LEN);
        let sig_arr: [u8; SIGNATURE_LEN] = sig_bytes
            .try_into()
            .map_err(|_| AuthError::Malformed("invalid signature length".into()))?;
        let signature = Signature::from_bytes(&sig_arr);

        self.signing_key
            .verifying_key()
            .verify(claims_bytes, &signature)
            .map_err(|_| AuthError::Malformed("signature verification failed".into()))?;

        let claims = TokenClaims::from_signing_bytes(claims_bytes)?;
        if claims.version != TOKEN_VERSION {
            return Err(AuthError::Malformed(format!(
                "unsupported token version {}",
                claims.version
            )));
        }

        if claims.is_expired(self.clock.now_millis()) {
            return Err(AuthError::Expired);
        }

        if self.store.is_revoked(&claims.token_id).await? {
            return Err(AuthError::Revoked);
        }

        Ok(VerifiedToken {
            role: claims.role,
            token_id: claims.token_id,
            expires_at: claims.expires_at,
        })
    }

    /// Revoke a token ahead of its natural expiry.
    ///
    /// The marker inherits the token's own expiry so the sweeper can
    /// drop it once the token would be rejected as expired anyway.
    /// Revoking an already revoked token succeeds without effect.
    pub async fn revoke(&self, token_id: TokenId, expires_at: i64) -> Result<()> {
        self.store
            .insert_revocation(RevokedTokenMarker::new(token_id, expires_at))
            .await?;
        tracing::debug!(token_id = %token_id.to_hex(), "revocation marker stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use carepass_core::clock::ManualClock;
    use carepass_store::MemoryStore;

    const LIFETIME: i64 = 12 * 60 * 60 * 1000;

    fn service(clock: &ManualClock) -> TokenService<MemoryStore> {
        let store = Arc::new(MemoryStore::new(clock.shared()));
        TokenService::new(store, clock.shared(), "test-signing-secret", LIFETIME)
    }

    #[tokio::test]
    async fn test_issue_verify_roundtrip() {
        let clock = ManualClock::new(5_000);
        let svc = service(&clock);

        let token = svc.issue(SubjectRole::Clinician);
        let verified = svc.verify(token.as_str()).await.unwrap();

        assert_eq!(verified.role, SubjectRole::Clinician);
        assert_eq!(verified.expires_at, 5_000 + LIFETIME);
    }

    #[tokio::test]
    async fn test_each_token_gets_a_fresh_id() {
        let clock = ManualClock::new(0);
        let svc = service(&clock);

        let a = svc.verify(svc.issue(SubjectRole::Patient).as_str()).await.unwrap();
        let b = svc.verify(svc.issue(SubjectRole::Patient).as_str()).await.unwrap();
        assert_ne!(a.token_id, b.token_id);
    }

    #[tokio::test]
    async fn test_tampered_token_rejected() {
        let clock = ManualClock::new(0);
        let svc = service(&clock);

        let mut chars: Vec<char> = svc.issue(SubjectRole::Patient).into_string().chars().collect();
        // Flip one hex digit inside the signed claims region.
        chars[10] = if chars[10] == '0' { '1' } else { '0' };
        let tampered: String = chars.into_iter().collect();

        assert!(matches!(
            svc.verify(&tampered).await,
            Err(AuthError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let clock = ManualClock::new(0);
        let store = Arc::new(MemoryStore::new(clock.shared()));
        let issuer = TokenService::new(Arc::clone(&store), clock.shared(), "secret-a", LIFETIME);
        let other = TokenService::new(store, clock.shared(), "secret-b", LIFETIME);

        let token = issuer.issue(SubjectRole::Clinician);
        assert!(matches!(
            other.verify(token.as_str()).await,
            Err(AuthError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_garbage_tokens_rejected() {
        let clock = ManualClock::new(0);
        let svc = service(&clock);

        for garbage in ["", "not-hex!", "abcd", &hex::encode([0u8; 80])] {
            assert!(
                matches!(svc.verify(garbage).await, Err(AuthError::Malformed(_))),
                "accepted: {garbage:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_expired_token() {
        let clock = ManualClock::new(1_000);
        let svc = service(&clock);

        let token = svc.issue(SubjectRole::Patient);
        clock.set(1_000 + LIFETIME - 1);
        assert!(svc.verify(token.as_str()).await.is_ok());

        clock.set(1_000 + LIFETIME);
        assert!(matches!(
            svc.verify(token.as_str()).await,
            Err(AuthError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_revoked_token() {
        let clock = ManualClock::new(0);
        let svc = service(&clock);

        let token = svc.issue(SubjectRole::Clinician);
        let verified = svc.verify(token.as_str()).await.unwrap();

        svc.revoke(verified.token_id, verified.expires_at).await.unwrap();
        assert!(matches!(
            svc.verify(token.as_str()).await,
            Err(AuthError::Revoked)
        ));

        // Re-revocation is a no-op success.
        svc.revoke(verified.token_id, verified.expires_at).await.unwrap();
        assert!(matches!(
            svc.verify(token.as_str()).await,
            Err(AuthError::Revoked)
        ));
    }

    #[tokio::test]
    async fn test_expiry_outranks_revocation_after_sweep() {
        let clock = ManualClock::new(0);
        let store = Arc::new(MemoryStore::new(clock.shared()));
        let svc = TokenService::new(Arc::clone(&store), clock.shared(), "s", 1_000);

        let token = svc.issue(SubjectRole::Patient);
        let verified = svc.verify(token.as_str()).await.unwrap();
        svc.revoke(verified.token_id, verified.expires_at).await.unwrap();

        // Once the token is past expiry the marker is collectable, and
        // verification reports Expired whether or not it is still there.
        clock.set(1_500);
        let report = store.sweep().await.unwrap();
        assert_eq!(report.markers_removed, 1);
        assert!(matches!(
            svc.verify(token.as_str()).await,
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn test_bearer_token_debug_is_truncated() {
        let clock = ManualClock::new(0);
        let svc = service(&clock);
        let token = svc.issue(SubjectRole::Patient);

        let debug = format!("{token:?}");
        assert!(debug.len() < token.as_str().len());
        assert!(debug.starts_with("BearerToken("));
    }
}
