use toolgate_core::{AgentId, ServerId, ToolId};
use toolgate_storage::StorageError;

/// Errors from registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The referenced agent profile does not exist.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// The referenced server does not exist.
    #[error("server not found: {0}")]
    ServerNotFound(ServerId),

    /// The referenced tool does not exist.
    #[error("tool not found: {0}")]
    ToolNotFound(ToolId),

    /// A tool with this name already exists on the server.
    #[error("duplicate tool name on {server}: {name}")]
    DuplicateToolName {
        /// The server the tool was being added to.
        server: ServerId,
        /// The conflicting tool name.
        name: String,
    },

    /// Tool discovery against a server failed.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// The underlying store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
