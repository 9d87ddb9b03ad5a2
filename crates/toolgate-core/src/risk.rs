//! Risk tier classification for tools.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Administrator-assigned risk classification of a tool.
///
/// The tier controls what the policy engine does with a permitted call:
/// `Safe` executes immediately, `NeedsApproval` is queued for human
/// review, `Blocked` is denied no matter what permissions say.
///
/// `Unknown` is never assigned through the API; it is the conservative
/// mapping for tier values in storage that this build does not
/// recognize (for example after a downgrade). The engine denies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// Execute without review once permission is granted.
    Safe,
    /// Queue for human approval even when permission is granted.
    NeedsApproval,
    /// Never execute, regardless of permissions.
    Blocked,
    /// Unrecognized tier value - treated as blocked.
    #[serde(other)]
    Unknown,
}

impl RiskTier {
    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::NeedsApproval => "needs_approval",
            Self::Blocked => "blocked",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a stored tier value, mapping anything unrecognized to
    /// [`RiskTier::Unknown`] rather than failing.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "safe" => Self::Safe,
            "needs_approval" => Self::NeedsApproval,
            "blocked" => Self::Blocked,
            _ => Self::Unknown,
        }
    }

    /// Whether this tier denies the call outright.
    #[must_use]
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked)
    }

    /// Whether a permitted call at this tier must wait for a human.
    #[must_use]
    pub const fn requires_approval(self) -> bool {
        matches!(self, Self::NeedsApproval)
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
