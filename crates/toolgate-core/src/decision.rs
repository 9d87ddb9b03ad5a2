//! Decision vocabulary shared by the policy engine and the audit log.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the policy engine decided what it decided.
///
/// Every audit record and every policy result carries exactly one
/// reason code. The first four arise at evaluation time, the last two
/// at approval-resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Safe tool, permission granted - executed immediately.
    Allowed,
    /// Tool risk tier is blocked (or unrecognized); permissions are irrelevant.
    BlockedRisk,
    /// No permission row, or permission explicitly denied.
    BlockedPermission,
    /// Permitted but approval-gated - queued for human review.
    NeedsApproval,
    /// A pending action was approved by a human.
    Approved,
    /// A pending action was denied by a human.
    DeniedByUser,
}

impl ReasonCode {
    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::BlockedRisk => "blocked_risk",
            Self::BlockedPermission => "blocked_permission",
            Self::NeedsApproval => "needs_approval",
            Self::Approved => "approved",
            Self::DeniedByUser => "denied_by_user",
        }
    }

    /// Parse a stored reason code.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "allowed" => Some(Self::Allowed),
            "blocked_risk" => Some(Self::BlockedRisk),
            "blocked_permission" => Some(Self::BlockedPermission),
            "needs_approval" => Some(Self::NeedsApproval),
            "approved" => Some(Self::Approved),
            "denied_by_user" => Some(Self::DeniedByUser),
            _ => None,
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal status of an audited decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// The call was authorized for execution.
    Executed,
    /// The call was denied.
    Denied,
}

impl DecisionStatus {
    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Executed => "executed",
            Self::Denied => "denied",
        }
    }

    /// Parse a stored status value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "executed" => Some(Self::Executed),
            "denied" => Some(Self::Denied),
            _ => None,
        }
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_roundtrip() {
        for reason in [
            ReasonCode::Allowed,
            ReasonCode::BlockedRisk,
            ReasonCode::BlockedPermission,
            ReasonCode::NeedsApproval,
            ReasonCode::Approved,
            ReasonCode::DeniedByUser,
        ] {
            assert_eq!(ReasonCode::parse(reason.as_str()), Some(reason));
        }
    }

    #[test]
    fn test_reason_parse_rejects_unknown() {
        assert_eq!(ReasonCode::parse("because"), None);
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [DecisionStatus::Executed, DecisionStatus::Denied] {
            assert_eq!(DecisionStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&ReasonCode::BlockedPermission).unwrap();
        assert_eq!(json, "\"blocked_permission\"");
    }
}
