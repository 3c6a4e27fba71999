//! Store failure modes.

use thiserror::Error;

/// What can go wrong while reading or writing the collections.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite reported a failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A lock guarding the store was poisoned by a panicking thread.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// A blocking database task failed to complete.
    #[error("blocking task failed: {0}")]
    TaskJoin(String),

    /// A stored row no longer parses, e.g. a code column that is not a
    /// valid share code.
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    /// The schema on disk cannot be brought to the current version.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
