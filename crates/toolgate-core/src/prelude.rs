//! Prelude module - commonly used types for convenient import.
//!
//! Use `use toolgate_core::prelude::*;` to import all essential types.

pub use crate::decision::{DecisionStatus, ReasonCode};
pub use crate::id::{AgentId, AuditRecordId, PendingActionId, ServerId, ToolId};
pub use crate::risk::RiskTier;
pub use crate::time::Timestamp;
