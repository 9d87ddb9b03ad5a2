use toolgate_approval::PolicyError;
use toolgate_audit::AuditError;
use toolgate_exec::ExecError;
use toolgate_registry::RegistryError;
use toolgate_storage::StorageError;

/// Errors surfaced by the gateway facade.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// An administrative or lookup operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Policy evaluation or approval resolution failed.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The audit log failed.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// The execution capability failed (infrastructure, not tool error).
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// The shared store failed outside any subsystem.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The argument payload could not be serialized.
    #[error("invalid argument payload: {0}")]
    Serialization(String),

    /// A batch request exceeded the configured limit.
    #[error("batch of {requested} exceeds limit of {limit}")]
    BatchTooLarge {
        /// How many ids the caller submitted.
        requested: usize,
        /// The configured ceiling.
        limit: usize,
    },
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
