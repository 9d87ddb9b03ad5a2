//! Storage error types.

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The underlying database reported an error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization or deserialization of a stored value failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored value is malformed (bad id, unknown status text, ...).
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The connection lock was poisoned or the handle is unusable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
