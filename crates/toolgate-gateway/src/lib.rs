//! Toolgate Gateway - the facade callers talk to.
//!
//! Wires the registry, policy engine, approval resolver, audit log, and
//! an injected [`ToolExecutor`](toolgate_exec::ToolExecutor) into one
//! surface:
//!
//! - [`Gateway::execute_tool`] validates the calling agent, evaluates
//!   the request, and - for immediate allows - carries the call to the
//!   executor and surfaces its outcome. A deny comes back as a normal
//!   report, not an error.
//! - [`Gateway::approve_action`] resolves a pending approval and then
//!   closes the loop by invoking the executor with the stored tool and
//!   arguments. [`Gateway::deny_action`] and
//!   [`Gateway::batch_approve`] only transition state.
//! - Administrative operations (agents, servers, tools, permissions,
//!   sync) pass through to the registry; agent deletion also cascades
//!   the agent's pending actions. Audit records are never cascaded.
//! - Read projections decorate pending actions and audit records with
//!   display names for UI layers, and [`Gateway::dashboard`] summarizes
//!   counts.
//!
//! Transport is out of scope: embed the gateway in-process or put a
//! thin RPC shim in front of it.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
/// Gateway error types.
pub mod error;
pub mod gateway;
pub mod views;

pub use config::{
    ApprovalsSection, ConfigError, ConfigResult, DatabaseSection, GatewayConfig, LoggingSection,
    PoolSection,
};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{ApprovalReport, ExecutionReport, Gateway};
pub use views::{AuditRecordView, DashboardSummary, PendingActionView};
