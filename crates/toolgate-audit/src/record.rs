//! Audit record type.

use serde::{Deserialize, Serialize};
use std::fmt;
use toolgate_core::{AgentId, AuditRecordId, DecisionStatus, ReasonCode, Timestamp, ToolId};

/// One terminal decision, as it will be stored forever.
///
/// Arguments are kept verbatim as the serialized payload the agent
/// submitted - the log answers "what exactly was requested", so nothing
/// is normalized or redacted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record identifier.
    pub id: AuditRecordId,
    /// The agent that made the request.
    pub agent_id: AgentId,
    /// The tool that was requested.
    pub tool_id: ToolId,
    /// The serialized argument payload, verbatim.
    pub arguments: String,
    /// Terminal status of the decision.
    pub status: DecisionStatus,
    /// Why the decision came out this way.
    pub reason: ReasonCode,
    /// When the decision reached its terminal state.
    pub timestamp: Timestamp,
}

impl AuditRecord {
    /// Create a record stamped with the current time.
    #[must_use]
    pub fn new(
        agent_id: AgentId,
        tool_id: ToolId,
        arguments: impl Into<String>,
        status: DecisionStatus,
        reason: ReasonCode,
    ) -> Self {
        Self {
            id: AuditRecordId::new(),
            agent_id,
            tool_id,
            arguments: arguments.into(),
            status,
            reason,
            timestamp: Timestamp::now(),
        }
    }
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {} ({})",
            self.timestamp, self.agent_id, self.tool_id, self.status, self.reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_creation() {
        let record = AuditRecord::new(
            AgentId::new(),
            ToolId::new(),
            "{}",
            DecisionStatus::Denied,
            ReasonCode::BlockedRisk,
        );
        assert_eq!(record.status, DecisionStatus::Denied);
        assert_eq!(record.reason, ReasonCode::BlockedRisk);
        assert_eq!(record.arguments, "{}");
    }

    #[test]
    fn test_display_mentions_status_and_reason() {
        let record = AuditRecord::new(
            AgentId::new(),
            ToolId::new(),
            "{}",
            DecisionStatus::Executed,
            ReasonCode::Allowed,
        );
        let rendered = record.to_string();
        assert!(rendered.contains("executed"));
        assert!(rendered.contains("allowed"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let record = AuditRecord::new(
            AgentId::new(),
            ToolId::new(),
            "{\"path\":\"/tmp/x\"}",
            DecisionStatus::Executed,
            ReasonCode::Approved,
        );
        let json = serde_json::to_string(&record).unwrap();
        let back: AuditRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.arguments, record.arguments);
    }
}
