//! Error types for the auth module.

use thiserror::Error;

/// Errors that can occur while issuing or verifying tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token could not be decoded or its signature does not verify.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Token is past its expiry timestamp.
    #[error("token expired")]
    Expired,

    /// Token was revoked before its natural expiry.
    #[error("token revoked")]
    Revoked,

    /// Revocation lookup failed.
    #[error("store error: {0}")]
    Store(#[from] carepass_store::StoreError),
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;
