use toolgate_core::{PendingActionId, ToolId};
use toolgate_storage::StorageError;

use crate::action::PendingStatus;

/// Errors from policy evaluation and approval resolution.
///
/// A denied decision is NOT an error - it is a successfully evaluated
/// [`crate::PolicyResult`] with `allowed: false`. These variants cover
/// the cases where evaluation or resolution itself could not proceed.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// The referenced tool does not exist; nothing was evaluated and no
    /// audit record was written.
    #[error("tool not found: {0}")]
    ToolNotFound(ToolId),

    /// The referenced pending action does not exist.
    #[error("pending action not found: {0}")]
    PendingActionNotFound(PendingActionId),

    /// The pending action has already been resolved. State is unchanged
    /// and no duplicate audit record was written.
    #[error("pending action {id} already resolved: {status}")]
    InvalidStateTransition {
        /// The action that was targeted.
        id: PendingActionId,
        /// Its current (terminal) status.
        status: PendingStatus,
    },

    /// The underlying store failed; the caller must assume no side
    /// effect occurred.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for the approval subsystem.
pub type ApprovalResult<T> = Result<T, PolicyError>;
