//! Policy evaluation.

use std::sync::Arc;

use toolgate_audit::{AuditLog, AuditRecord};
use toolgate_core::{AgentId, DecisionStatus, ReasonCode, RiskTier, ToolId};
use toolgate_registry::Registry;
use toolgate_storage::Db;

use crate::action::PendingAction;
use crate::error::{ApprovalResult, PolicyError};
use crate::result::PolicyResult;
use crate::store::PendingStore;

/// Outcome of the evaluation transaction, resolved to an error or a
/// result once the transaction has committed.
enum Eval {
    ToolMissing,
    Decided(PolicyResult),
}

/// The decision procedure.
///
/// Holds the shared database plus the audit log and pending store it
/// writes through, so the lookups and the paired side effect share one
/// transaction. See the crate docs for the rule table.
pub struct PolicyEngine {
    db: Arc<Db>,
    audit: Arc<AuditLog>,
    pending: PendingStore,
}

impl PolicyEngine {
    /// Build the engine over an initialized audit log and pending store.
    #[must_use]
    pub fn new(db: Arc<Db>, audit: Arc<AuditLog>, pending: PendingStore) -> Self {
        Self { db, audit, pending }
    }

    /// Evaluate one execution request.
    ///
    /// `arguments_json` is an opaque serialized payload; this component
    /// stores it verbatim and never validates it against a schema.
    ///
    /// Exactly one of the following happens on success: a terminal
    /// audit record is written, or a pending action is queued. On any
    /// error nothing is written.
    ///
    /// Agent existence is deliberately NOT checked here - a nonexistent
    /// agent evaluates exactly like a non-permitted one. Callers that
    /// want `AgentNotFound` semantics (the gateway does) validate the
    /// agent first.
    ///
    /// # Errors
    ///
    /// [`PolicyError::ToolNotFound`] if the tool id does not resolve,
    /// [`PolicyError::Storage`] on persistence failure.
    pub fn evaluate(
        &self,
        agent_id: &AgentId,
        tool_id: &ToolId,
        arguments_json: &str,
    ) -> ApprovalResult<PolicyResult> {
        let eval = self.db.transaction(|tx| {
            let Some(tool) = Registry::tool_tx(tx, tool_id)? else {
                return Ok(Eval::ToolMissing);
            };
            let allowed = Registry::permission_tx(tx, agent_id, tool_id)?.unwrap_or(false);

            // First matching rule wins, top to bottom.
            let result = match (tool.risk_tier, allowed) {
                // Administrative kill-switch: no grant bypasses a block.
                (RiskTier::Blocked, _) => {
                    let record = AuditRecord::new(
                        *agent_id,
                        *tool_id,
                        arguments_json,
                        DecisionStatus::Denied,
                        ReasonCode::BlockedRisk,
                    );
                    self.audit.append_tx(tx, &record)?;
                    PolicyResult::denied(ReasonCode::BlockedRisk, record.id)
                }
                // Checked before the tier so a non-permitted agent cannot
                // learn how the tool is classified.
                (_, false) => {
                    let record = AuditRecord::new(
                        *agent_id,
                        *tool_id,
                        arguments_json,
                        DecisionStatus::Denied,
                        ReasonCode::BlockedPermission,
                    );
                    self.audit.append_tx(tx, &record)?;
                    PolicyResult::denied(ReasonCode::BlockedPermission, record.id)
                }
                (RiskTier::Safe, true) => {
                    let record = AuditRecord::new(
                        *agent_id,
                        *tool_id,
                        arguments_json,
                        DecisionStatus::Executed,
                        ReasonCode::Allowed,
                    );
                    self.audit.append_tx(tx, &record)?;
                    PolicyResult::allowed(record.id)
                }
                (RiskTier::NeedsApproval, true) => {
                    let action = PendingAction::new(*agent_id, *tool_id, arguments_json);
                    PendingStore::insert_tx(tx, &action)?;
                    PolicyResult::deferred(action.id)
                }
                (RiskTier::Unknown, true) => {
                    tracing::warn!(
                        tool = %tool_id,
                        "unrecognized risk tier in storage, denying conservatively"
                    );
                    let record = AuditRecord::new(
                        *agent_id,
                        *tool_id,
                        arguments_json,
                        DecisionStatus::Denied,
                        ReasonCode::BlockedRisk,
                    );
                    self.audit.append_tx(tx, &record)?;
                    PolicyResult::denied(ReasonCode::BlockedRisk, record.id).with_unrecognized_tier()
                }
            };
            Ok(Eval::Decided(result))
        })?;

        match eval {
            Eval::ToolMissing => Err(PolicyError::ToolNotFound(*tool_id)),
            Eval::Decided(result) => {
                tracing::info!(
                    agent = %agent_id,
                    tool = %tool_id,
                    decision = %result,
                    "evaluated execution request"
                );
                Ok(result)
            }
        }
    }

    /// The pending store this engine enqueues into.
    #[must_use]
    pub fn pending(&self) -> &PendingStore {
        &self.pending
    }
}

impl std::fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEngine").finish_non_exhaustive()
    }
}
