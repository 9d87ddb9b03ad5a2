//! Evaluation result type.

use serde::{Deserialize, Serialize};
use std::fmt;
use toolgate_core::{AuditRecordId, PendingActionId, ReasonCode};

/// What the policy engine decided about one execution request.
///
/// A denial is a successful evaluation - callers must check `allowed`
/// (and `reason`) rather than treating the call as failed. Exactly one
/// of `pending_action_id` / `audit_record_id` is set: deferred requests
/// have a pending action and no audit record yet, terminal decisions
/// have an audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResult {
    /// Whether the call may execute right now.
    pub allowed: bool,
    /// Why the decision came out this way.
    pub reason: ReasonCode,
    /// The queued action, when the decision was deferred.
    pub pending_action_id: Option<PendingActionId>,
    /// The audit record documenting a terminal decision.
    pub audit_record_id: Option<AuditRecordId>,
    /// Diagnostic marker: the deny was caused by a risk tier value this
    /// build does not recognize (reported as `blocked_risk`).
    pub unrecognized_tier: bool,
}

impl PolicyResult {
    /// An immediate allow, documented by `audit_record_id`.
    #[must_use]
    pub fn allowed(audit_record_id: AuditRecordId) -> Self {
        Self {
            allowed: true,
            reason: ReasonCode::Allowed,
            pending_action_id: None,
            audit_record_id: Some(audit_record_id),
            unrecognized_tier: false,
        }
    }

    /// A terminal deny with the given reason.
    #[must_use]
    pub fn denied(reason: ReasonCode, audit_record_id: AuditRecordId) -> Self {
        Self {
            allowed: false,
            reason,
            pending_action_id: None,
            audit_record_id: Some(audit_record_id),
            unrecognized_tier: false,
        }
    }

    /// A deferred decision, queued as `pending_action_id`.
    #[must_use]
    pub fn deferred(pending_action_id: PendingActionId) -> Self {
        Self {
            allowed: false,
            reason: ReasonCode::NeedsApproval,
            pending_action_id: Some(pending_action_id),
            audit_record_id: None,
            unrecognized_tier: false,
        }
    }

    /// Mark the deny as caused by an unrecognized tier value.
    #[must_use]
    pub fn with_unrecognized_tier(mut self) -> Self {
        self.unrecognized_tier = true;
        self
    }

    /// Whether the decision was deferred for approval.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        self.pending_action_id.is_some()
    }
}

impl fmt::Display for PolicyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.allowed {
            write!(f, "allowed ({})", self.reason)
        } else if self.is_deferred() {
            write!(f, "deferred ({})", self.reason)
        } else {
            write!(f, "denied ({})", self.reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed() {
        let result = PolicyResult::allowed(AuditRecordId::new());
        assert!(result.allowed);
        assert!(!result.is_deferred());
        assert!(result.audit_record_id.is_some());
        assert_eq!(result.to_string(), "allowed (allowed)");
    }

    #[test]
    fn test_denied() {
        let result = PolicyResult::denied(ReasonCode::BlockedRisk, AuditRecordId::new());
        assert!(!result.allowed);
        assert!(!result.is_deferred());
        assert_eq!(result.to_string(), "denied (blocked_risk)");
    }

    #[test]
    fn test_deferred() {
        let result = PolicyResult::deferred(PendingActionId::new());
        assert!(!result.allowed);
        assert!(result.is_deferred());
        assert!(result.audit_record_id.is_none());
        assert_eq!(result.to_string(), "deferred (needs_approval)");
    }

    #[test]
    fn test_unrecognized_marker() {
        let result = PolicyResult::denied(ReasonCode::BlockedRisk, AuditRecordId::new())
            .with_unrecognized_tier();
        assert!(result.unrecognized_tier);
        assert_eq!(result.reason, ReasonCode::BlockedRisk);
    }
}
