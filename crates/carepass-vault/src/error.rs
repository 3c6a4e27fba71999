//! Error types for the vault module.

use thiserror::Error;

/// What went wrong inside a failed decryption.
///
/// Kept for diagnostics; callers branch on [`VaultError::Decryption`]
/// as a whole, never on the cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionCause {
    /// The blob itself could not be parsed.
    MalformedBlob,
    /// The nonce is not 12 bytes.
    NonceLength,
    /// The authentication tag did not verify.
    AuthenticationFailed,
    /// The decrypted plaintext did not decode to the expected type.
    PlaintextDecode,
}

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Decryption failed; no partial data is ever returned.
    #[error("decryption failed")]
    Decryption {
        /// Diagnostic detail for logs.
        cause: DecryptionCause,
    },

    /// Filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be serialized for encryption or persistence.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Encryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),
}

impl VaultError {
    pub(crate) fn decryption(cause: DecryptionCause) -> Self {
        VaultError::Decryption { cause }
    }
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
