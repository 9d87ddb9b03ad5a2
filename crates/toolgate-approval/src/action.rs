//! Pending action type and its state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use toolgate_core::{AgentId, PendingActionId, Timestamp, ToolId};

/// Lifecycle state of a pending action.
///
/// The only legal transitions are `Pending -> Approved` and
/// `Pending -> Denied`, each at most once. Terminal states never
/// transition again; the store enforces this with a conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    /// Awaiting a human decision.
    Pending,
    /// Approved - terminal.
    Approved,
    /// Denied - terminal.
    Denied,
}

impl PendingStatus {
    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }

    /// Parse a stored status value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "denied" => Some(Self::Denied),
            _ => None,
        }
    }

    /// Whether this state accepts no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deferred decision awaiting human approve/deny.
///
/// Created only by the policy engine, for permitted calls to
/// approval-gated tools. Never deleted by resolution - the terminal
/// status is the marker, and the row stays for the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAction {
    /// Unique identifier.
    pub id: PendingActionId,
    /// The agent that made the request.
    pub agent_id: AgentId,
    /// The tool that was requested.
    pub tool_id: ToolId,
    /// The serialized argument payload, verbatim.
    pub arguments: String,
    /// Current lifecycle state.
    pub status: PendingStatus,
    /// When the request was deferred.
    pub created_at: Timestamp,
}

impl PendingAction {
    /// Create a fresh action in the `Pending` state.
    #[must_use]
    pub fn new(agent_id: AgentId, tool_id: ToolId, arguments: impl Into<String>) -> Self {
        Self {
            id: PendingActionId::new(),
            agent_id,
            tool_id,
            arguments: arguments.into(),
            status: PendingStatus::Pending,
            created_at: Timestamp::now(),
        }
    }
}

impl fmt::Display for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} [{}]",
            self.id, self.agent_id, self.tool_id, self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_action_is_pending() {
        let action = PendingAction::new(AgentId::new(), ToolId::new(), "{}");
        assert_eq!(action.status, PendingStatus::Pending);
        assert!(!action.status.is_terminal());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            PendingStatus::Pending,
            PendingStatus::Approved,
            PendingStatus::Denied,
        ] {
            assert_eq!(PendingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PendingStatus::parse("escalated"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(PendingStatus::Approved.is_terminal());
        assert!(PendingStatus::Denied.is_terminal());
        assert!(!PendingStatus::Pending.is_terminal());
    }
}
