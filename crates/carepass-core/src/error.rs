//! Failure modes shared across the Carepass crates.

use thiserror::Error;

/// Errors raised by code parsing and payload decoding.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The string does not have the `PREFIX-XXXX-YYY` shape or uses
    /// characters outside the code alphabet.
    #[error("malformed share code: {0}")]
    MalformedCode(String),

    /// The prefix is well formed but not one the relay issues.
    #[error("unknown code prefix: {0}")]
    UnknownPrefix(String),

    /// Stored bytes did not decode to the expected payload shape.
    #[error("payload decode error: {0}")]
    PayloadDecode(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
