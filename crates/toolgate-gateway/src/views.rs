//! Read projections for UI layers.
//!
//! These decorate core records with display names. Names are optional
//! because the entities can outlive each other - an audit record keeps
//! referencing an agent that was deleted last week.

use serde::{Deserialize, Serialize};
use toolgate_approval::PendingAction;
use toolgate_audit::AuditRecord;

/// A pending action with display context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingActionView {
    /// The action itself.
    pub action: PendingAction,
    /// Name of the requesting agent, if it still exists.
    pub agent_name: Option<String>,
    /// Name of the requested tool, if it still exists.
    pub tool_name: Option<String>,
    /// Name of the tool's server, if it still exists.
    pub server_name: Option<String>,
}

/// An audit record with display context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecordView {
    /// The record itself.
    pub record: AuditRecord,
    /// Name of the agent, if it still exists.
    pub agent_name: Option<String>,
    /// Name of the tool, if it still exists.
    pub tool_name: Option<String>,
    /// Name of the tool's server, if it still exists.
    pub server_name: Option<String>,
}

/// Headline counts for a dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Agent profiles.
    pub agents: usize,
    /// Servers.
    pub servers: usize,
    /// Tools.
    pub tools: usize,
    /// Actions awaiting approval.
    pub pending_approvals: usize,
    /// Audit records written so far.
    pub audit_records: usize,
}
