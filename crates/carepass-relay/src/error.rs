//! Error types for the relay.

use carepass_auth::AuthError;
use carepass_core::CoreError;
use carepass_store::StoreError;
use thiserror::Error;

/// Errors that can occur during relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No entry exists for the presented code.
    #[error("code not found")]
    NotFound,

    /// The bundle behind the code has expired.
    #[error("share code expired")]
    Expired,

    /// The grant behind the code has ended.
    #[error("session expired")]
    SessionExpired,

    /// Access key does not match the requested role.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Bearer token rejected. One external message for every cause;
    /// the source keeps malformed, expired, and revoked apart for logs.
    #[error("authentication failed")]
    Auth(#[source] AuthError),

    /// Input failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Storage failure.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Payload codec failure.
    #[error("payload error: {0}")]
    Payload(#[from] CoreError),
}

// A store failure inside token verification is a server fault, not an
// authentication outcome.
impl From<AuthError> for RelayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(store) => RelayError::Store(store),
            other => RelayError::Auth(other),
        }
    }
}

impl RelayError {
    /// Conventional status code for a transport adapter.
    pub fn wire_status(&self) -> u16 {
        match self {
            RelayError::NotFound => 404,
            RelayError::Expired => 410,
            RelayError::SessionExpired => 403,
            RelayError::InvalidCredentials | RelayError::Auth(_) => 401,
            RelayError::Validation(_) => 422,
            RelayError::Store(_) | RelayError::Payload(_) => 500,
        }
    }
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
