//! Entity identifiers.
//!
//! Every durable entity has a UUID-backed newtype id. The `Display` form
//! carries a short prefix (`agent:`, `tool:`, ...) so ids are unambiguous
//! in logs; storage keeps the bare UUID string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error returned when an identifier string cannot be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid {kind} id: {input}")]
pub struct IdParseError {
    /// Which identifier type was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub input: String,
}

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            /// Parse from either the prefixed display form or a bare UUID.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bare = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                Uuid::parse_str(bare)
                    .map(Self)
                    .map_err(|_| IdParseError {
                        kind: $kind,
                        input: s.to_string(),
                    })
            }
        }
    };
}

entity_id!(
    /// Identifier of an agent profile (a calling principal).
    AgentId,
    "agent",
    "agent"
);

entity_id!(
    /// Identifier of a tool server.
    ServerId,
    "srv",
    "server"
);

entity_id!(
    /// Identifier of a tool exposed by a server.
    ToolId,
    "tool",
    "tool"
);

entity_id!(
    /// Identifier of a pending approval action.
    PendingActionId,
    "pa",
    "pending action"
);

entity_id!(
    /// Identifier of an audit log record.
    AuditRecordId,
    "audit",
    "audit record"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(AgentId::new(), AgentId::new());
        assert_ne!(ToolId::new(), ToolId::new());
    }

    #[test]
    fn test_display_prefix() {
        assert!(AgentId::new().to_string().starts_with("agent:"));
        assert!(ServerId::new().to_string().starts_with("srv:"));
        assert!(PendingActionId::new().to_string().starts_with("pa:"));
    }

    #[test]
    fn test_parse_roundtrip() {
        let id = ToolId::new();
        let parsed: ToolId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_bare_uuid() {
        let id = AuditRecordId::new();
        let parsed: AuditRecordId = id.as_uuid().to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = "tool:not-a-uuid".parse::<ToolId>().unwrap_err();
        assert_eq!(err.kind, "tool");
    }

    #[test]
    fn test_serde_roundtrip() {
        let id = AgentId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: AgentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
