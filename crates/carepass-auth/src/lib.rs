//! # Carepass Auth
//!
//! Bearer tokens for the Carepass relay: issuing, verification, and
//! revocation.
//!
//! ## Overview
//!
//! A token is `hex(claims || signature)`: canonical CBOR claims signed
//! with Ed25519. The signing key is derived from a configured secret,
//! so no key material is stored. Revocation writes a marker into the
//! shared [`EphemeralStore`](carepass_store::EphemeralStore); markers
//! live exactly as long as the token they block would have.
//!
//! Verification runs exactly one expiry check, against the clock
//! injected at construction. Callers that need "expired" and "invalid"
//! to look the same externally collapse the distinct [`AuthError`]
//! variants themselves.
//!
//! ## Key Types
//!
//! - [`TokenService`] - Issues, verifies, and revokes tokens
//! - [`BearerToken`] - A minted token in wire form
//! - [`VerifiedToken`] - Role, token id, and expiry of a valid token
//! - [`TokenClaims`] - The signed claims content
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use carepass_auth::{TokenService, DEFAULT_TOKEN_LIFETIME_MILLIS};
//! use carepass_core::clock::SystemClock;
//! use carepass_core::types::SubjectRole;
//! use carepass_store::MemoryStore;
//!
//! async fn example() {
//!     let clock = SystemClock::shared();
//!     let store = Arc::new(MemoryStore::new(Arc::clone(&clock)));
//!     let tokens = TokenService::new(store, clock, "signing secret", DEFAULT_TOKEN_LIFETIME_MILLIS);
//!
//!     let token = tokens.issue(SubjectRole::Patient);
//!     let verified = tokens.verify(token.as_str()).await.unwrap();
//!     tokens.revoke(verified.token_id, verified.expires_at).await.unwrap();
//! }
//! ```

pub mod claims;
pub mod error;
pub mod service;

pub use claims::{TokenClaims, TOKEN_VERSION};
pub use error::{AuthError, Result};
pub use service::{BearerToken, TokenService, VerifiedToken, DEFAULT_TOKEN_LIFETIME_MILLIS};
