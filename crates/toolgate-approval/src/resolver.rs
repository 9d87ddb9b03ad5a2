//! Approval resolution.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use toolgate_audit::{AuditLog, AuditRecord};
use toolgate_core::{DecisionStatus, PendingActionId, ReasonCode};
use toolgate_storage::{Db, StorageError};

use crate::action::{PendingAction, PendingStatus};
use crate::error::{ApprovalResult, PolicyError};
use crate::store::{PendingStore, ResolveTx};

/// A human's verdict on a pending action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Authorize the call.
    Approve,
    /// Refuse the call.
    Deny,
}

impl Resolution {
    /// The terminal pending-action status this verdict produces.
    #[must_use]
    pub const fn terminal_status(self) -> PendingStatus {
        match self {
            Self::Approve => PendingStatus::Approved,
            Self::Deny => PendingStatus::Denied,
        }
    }

    /// The audit status this verdict produces.
    #[must_use]
    pub const fn decision_status(self) -> DecisionStatus {
        match self {
            Self::Approve => DecisionStatus::Executed,
            Self::Deny => DecisionStatus::Denied,
        }
    }

    /// The audit reason code this verdict produces.
    #[must_use]
    pub const fn reason(self) -> ReasonCode {
        match self {
            Self::Approve => ReasonCode::Approved,
            Self::Deny => ReasonCode::DeniedByUser,
        }
    }
}

/// One failed item of a batch resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    /// The action that failed to resolve.
    pub id: PendingActionId,
    /// Why it failed.
    pub error: String,
}

/// Per-item tally of a batch resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Actions that reached the requested terminal state.
    pub succeeded: usize,
    /// Actions that did not.
    pub failed: usize,
    /// The failures, in input order.
    pub failures: Vec<BatchFailure>,
}

/// Outcome of the resolution transaction.
enum Resolved {
    NotFound,
    NotPending(PendingStatus),
    Done(PendingAction),
}

/// Transitions pending actions to their terminal state, exactly once,
/// and writes the matching audit record in the same transaction.
///
/// Resolution only authorizes. For approvals the caller (the gateway)
/// is expected to invoke the execution capability afterwards with the
/// action's tool and stored arguments; the execution result is not
/// written back into the audit record.
#[derive(Clone)]
pub struct ApprovalResolver {
    db: Arc<Db>,
    audit: Arc<AuditLog>,
    pending: PendingStore,
}

impl ApprovalResolver {
    /// Build the resolver over an initialized audit log and pending store.
    #[must_use]
    pub fn new(db: Arc<Db>, audit: Arc<AuditLog>, pending: PendingStore) -> Self {
        Self { db, audit, pending }
    }

    /// Resolve one pending action.
    ///
    /// Returns the action in its new terminal state.
    ///
    /// # Errors
    ///
    /// [`PolicyError::PendingActionNotFound`] for unknown ids,
    /// [`PolicyError::InvalidStateTransition`] when the action is
    /// already terminal (state unchanged, no duplicate audit record),
    /// [`PolicyError::Storage`] on persistence failure.
    pub fn resolve(
        &self,
        id: &PendingActionId,
        resolution: Resolution,
    ) -> ApprovalResult<PendingAction> {
        let outcome = self.db.transaction(|tx| {
            match PendingStore::resolve_tx(tx, id, resolution.terminal_status())? {
                ResolveTx::NotFound => Ok(Resolved::NotFound),
                ResolveTx::NotPending(status) => Ok(Resolved::NotPending(status)),
                ResolveTx::Resolved(action) => {
                    let record = AuditRecord::new(
                        action.agent_id,
                        action.tool_id,
                        action.arguments.clone(),
                        resolution.decision_status(),
                        resolution.reason(),
                    );
                    self.audit.append_tx(tx, &record)?;
                    Ok(Resolved::Done(action))
                }
            }
        })?;

        match outcome {
            Resolved::NotFound => Err(PolicyError::PendingActionNotFound(*id)),
            Resolved::NotPending(status) => {
                Err(PolicyError::InvalidStateTransition { id: *id, status })
            }
            Resolved::Done(action) => {
                tracing::info!(
                    action = %action.id,
                    status = %action.status,
                    "pending action resolved"
                );
                Ok(action)
            }
        }
    }

    /// Resolve a set of actions, each independently.
    ///
    /// Items fan out as blocking tasks and are joined; one failure never
    /// aborts the others. The outcome tallies successes and failures in
    /// input order.
    pub async fn batch_resolve(
        &self,
        ids: &[PendingActionId],
        resolution: Resolution,
    ) -> BatchOutcome {
        let tasks = ids.iter().copied().map(|id| {
            let resolver = self.clone();
            async move {
                let joined =
                    tokio::task::spawn_blocking(move || resolver.resolve(&id, resolution)).await;
                let result = match joined {
                    Ok(result) => result,
                    Err(e) => Err(PolicyError::Storage(StorageError::Unavailable(
                        e.to_string(),
                    ))),
                };
                (id, result)
            }
        });

        let mut outcome = BatchOutcome::default();
        for (id, result) in futures::future::join_all(tasks).await {
            match result {
                Ok(_) => outcome.succeeded = outcome.succeeded.saturating_add(1),
                Err(e) => {
                    outcome.failed = outcome.failed.saturating_add(1);
                    outcome.failures.push(BatchFailure {
                        id,
                        error: e.to_string(),
                    });
                }
            }
        }
        tracing::info!(
            requested = ids.len(),
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "batch resolution finished"
        );
        outcome
    }

    /// The pending store this resolver transitions.
    #[must_use]
    pub fn pending(&self) -> &PendingStore {
        &self.pending
    }
}

impl std::fmt::Debug for ApprovalResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PolicyEngine;
    use toolgate_core::{AgentId, RiskTier, ToolId};
    use toolgate_registry::{NewAgent, NewServer, NewTool, Registry, ServerKind};

    struct Fixture {
        audit: Arc<AuditLog>,
        engine: PolicyEngine,
        resolver: ApprovalResolver,
        agent: AgentId,
        tool: ToolId,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(Db::in_memory().unwrap());
        let registry = Registry::new(Arc::clone(&db)).unwrap();
        let audit = Arc::new(AuditLog::new(Arc::clone(&db)).unwrap());
        let pending = PendingStore::new(Arc::clone(&db)).unwrap();
        let engine = PolicyEngine::new(
            Arc::clone(&db),
            Arc::clone(&audit),
            pending.clone(),
        );
        let resolver = ApprovalResolver::new(Arc::clone(&db), Arc::clone(&audit), pending);

        let agent = registry
            .create_agent(NewAgent {
                name: "assistant".to_string(),
                description: None,
                host_type: "claude-desktop".to_string(),
                api_key: None,
            })
            .unwrap();
        let server = registry
            .create_server(NewServer {
                name: "github".to_string(),
                kind: ServerKind::Mcp,
                command: None,
                base_url: None,
                description: None,
            })
            .unwrap();
        let tool = registry
            .create_tool(NewTool {
                server_id: server.id,
                name: "create_issue".to_string(),
                description: None,
                input_schema: None,
                risk_tier: Some(RiskTier::NeedsApproval),
            })
            .unwrap();
        registry.grant(&agent.id, &tool.id).unwrap();

        Fixture {
            audit,
            engine,
            resolver,
            agent: agent.id,
            tool: tool.id,
        }
    }

    fn defer(fx: &Fixture) -> PendingActionId {
        fx.engine
            .evaluate(&fx.agent, &fx.tool, "{\"title\":\"bug\"}")
            .unwrap()
            .pending_action_id
            .unwrap()
    }

    #[test]
    fn test_approve_writes_audit_record() {
        let fx = fixture();
        let id = defer(&fx);

        let action = fx.resolver.resolve(&id, Resolution::Approve).unwrap();
        assert_eq!(action.status, PendingStatus::Approved);

        let records = fx.audit.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DecisionStatus::Executed);
        assert_eq!(records[0].reason, ReasonCode::Approved);
        assert_eq!(records[0].arguments, "{\"title\":\"bug\"}");
    }

    #[test]
    fn test_deny_writes_audit_record() {
        let fx = fixture();
        let id = defer(&fx);

        let action = fx.resolver.resolve(&id, Resolution::Deny).unwrap();
        assert_eq!(action.status, PendingStatus::Denied);

        let records = fx.audit.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DecisionStatus::Denied);
        assert_eq!(records[0].reason, ReasonCode::DeniedByUser);
    }

    #[test]
    fn test_double_resolution_fails_without_duplicate_audit() {
        let fx = fixture();
        let id = defer(&fx);

        fx.resolver.resolve(&id, Resolution::Approve).unwrap();
        let err = fx.resolver.resolve(&id, Resolution::Approve).unwrap_err();
        assert!(matches!(
            err,
            PolicyError::InvalidStateTransition {
                status: PendingStatus::Approved,
                ..
            }
        ));

        // Approve-then-deny is equally rejected.
        let err = fx.resolver.resolve(&id, Resolution::Deny).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidStateTransition { .. }));

        assert_eq!(fx.audit.records().unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_unknown_id() {
        let fx = fixture();
        let err = fx
            .resolver
            .resolve(&PendingActionId::new(), Resolution::Approve)
            .unwrap_err();
        assert!(matches!(err, PolicyError::PendingActionNotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_batch_resolve_isolates_failures() {
        let fx = fixture();
        let a = defer(&fx);
        let b = defer(&fx);
        let bogus = PendingActionId::new();

        let outcome = fx
            .resolver
            .batch_resolve(&[a, bogus, b], Resolution::Approve)
            .await;
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, bogus);

        for id in [a, b] {
            let action = fx.resolver.pending().get(&id).unwrap().unwrap();
            assert_eq!(action.status, PendingStatus::Approved);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_resolution_is_exactly_once() {
        let fx = fixture();
        let id = defer(&fx);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let resolver = fx.resolver.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                resolver.resolve(&id, Resolution::Approve)
            }));
        }

        let mut wins = 0usize;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins = wins.saturating_add(1);
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(fx.audit.records().unwrap().len(), 1);
    }
}
