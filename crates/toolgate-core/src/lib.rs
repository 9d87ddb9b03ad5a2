//! Toolgate Core - Foundation types for the Toolgate policy gateway.
//!
//! This crate provides:
//! - Newtype identifiers for every entity the gateway tracks
//! - The [`RiskTier`] classification attached to tools
//! - The decision vocabulary shared by the policy engine and the audit log
//! - UTC timestamps used across all durable records
//!
//! Nothing in here touches storage or I/O; higher crates compose these
//! types into the permission store, the audit log, and the approval queue.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod decision;
pub mod id;
pub mod risk;
pub mod time;

pub use decision::{DecisionStatus, ReasonCode};
pub use id::{AgentId, AuditRecordId, IdParseError, PendingActionId, ServerId, ToolId};
pub use risk::RiskTier;
pub use time::Timestamp;
