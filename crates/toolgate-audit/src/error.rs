use toolgate_storage::StorageError;

/// Errors from audit log operations.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The underlying store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
