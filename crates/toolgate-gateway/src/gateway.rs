//! The gateway facade.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use toolgate_approval::{
    ApprovalResolver, BatchOutcome, PendingAction, PendingStatus, PendingStore, PolicyEngine,
    PolicyResult, Resolution,
};
use toolgate_audit::AuditLog;
use toolgate_core::{AgentId, PendingActionId, RiskTier, ServerId, ToolId};
use toolgate_exec::{ExecutionOutcome, ToolExecutor};
use toolgate_registry::{
    AgentProfile, NewAgent, NewServer, NewTool, Registry, RegistryError, Server, SyncReport, Tool,
    ToolDiscovery, ToolPermission,
};
use toolgate_storage::Db;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::views::{AuditRecordView, DashboardSummary, PendingActionView};

/// Default ceiling on batch resolutions when no config is supplied.
const DEFAULT_BATCH_LIMIT: usize = 64;

/// What one `execute_tool` call came to.
///
/// `policy` is always present; `execution` is set only when the policy
/// allowed immediately AND the executor was invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// The policy decision.
    pub policy: PolicyResult,
    /// The downstream outcome, for immediate allows.
    pub execution: Option<ExecutionOutcome>,
}

/// What one approval came to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalReport {
    /// The action in its terminal state.
    pub action: PendingAction,
    /// The downstream outcome; `None` when the tool no longer exists.
    pub execution: Option<ExecutionOutcome>,
}

/// The assembled gateway.
pub struct Gateway {
    registry: Arc<Registry>,
    audit: Arc<AuditLog>,
    pending: PendingStore,
    engine: PolicyEngine,
    resolver: ApprovalResolver,
    executor: Arc<dyn ToolExecutor>,
    batch_limit: usize,
}

impl Gateway {
    /// Assemble a gateway over an open database.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] (or a subsystem error) if any
    /// schema cannot be applied.
    pub fn new(db: Arc<Db>, executor: Arc<dyn ToolExecutor>) -> GatewayResult<Self> {
        let registry = Arc::new(Registry::new(Arc::clone(&db))?);
        let audit = Arc::new(AuditLog::new(Arc::clone(&db))?);
        let pending = PendingStore::new(Arc::clone(&db))?;
        let engine = PolicyEngine::new(Arc::clone(&db), Arc::clone(&audit), pending.clone());
        let resolver = ApprovalResolver::new(db, Arc::clone(&audit), pending.clone());
        Ok(Self {
            registry,
            audit,
            pending,
            engine,
            resolver,
            executor,
            batch_limit: DEFAULT_BATCH_LIMIT,
        })
    }

    /// Assemble over an in-memory database (tests, experiments).
    ///
    /// # Errors
    ///
    /// Same conditions as [`Gateway::new`].
    pub fn in_memory(executor: Arc<dyn ToolExecutor>) -> GatewayResult<Self> {
        Self::new(Arc::new(Db::in_memory()?), executor)
    }

    /// Assemble from configuration, opening its database path.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Gateway::new`], plus
    /// [`GatewayError::Storage`] if the file cannot be opened.
    pub fn from_config(
        config: &GatewayConfig,
        executor: Arc<dyn ToolExecutor>,
    ) -> GatewayResult<Self> {
        let mut gateway = Self::open(&config.database.path, executor)?;
        gateway.batch_limit = config.approvals.batch_limit;
        Ok(gateway)
    }

    /// Assemble over a database file.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Gateway::new`].
    pub fn open(path: impl AsRef<Path>, executor: Arc<dyn ToolExecutor>) -> GatewayResult<Self> {
        Self::new(Arc::new(Db::open(path)?), executor)
    }

    // ----- the execution flow -----

    /// Evaluate a tool-call request and, when immediately allowed, carry
    /// it to the executor.
    ///
    /// The agent is validated first: a nonexistent agent is a request
    /// error here, not a deny. A deny decision is NOT an error - the
    /// report comes back with `policy.allowed == false` and callers must
    /// distinguish that from this function failing.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AgentNotFound`] /
    /// [`toolgate_approval::PolicyError::ToolNotFound`] for dangling
    /// references, [`GatewayError::Exec`] when the downstream dispatch
    /// itself breaks, [`GatewayError::Storage`] on persistence failure.
    pub async fn execute_tool(
        &self,
        agent_id: &AgentId,
        tool_id: &ToolId,
        arguments: &Value,
    ) -> GatewayResult<ExecutionReport> {
        if self.registry.agent(agent_id)?.is_none() {
            return Err(RegistryError::AgentNotFound(*agent_id).into());
        }
        let arguments_json = serde_json::to_string(arguments)
            .map_err(|e| GatewayError::Serialization(e.to_string()))?;

        let policy = self.engine.evaluate(agent_id, tool_id, &arguments_json)?;
        if !policy.allowed {
            return Ok(ExecutionReport {
                policy,
                execution: None,
            });
        }

        // Immediate allow: the tool resolved a moment ago inside the
        // evaluation; a concurrent delete between then and now reads as
        // a failed dispatch.
        let execution = match self.registry.tool(tool_id)? {
            Some(tool) => Some(
                self.executor
                    .invoke(&tool.server_id, &tool.name, &arguments_json)
                    .await?,
            ),
            None => {
                tracing::warn!(tool = %tool_id, "tool deleted between evaluation and dispatch");
                Some(ExecutionOutcome::failure("tool no longer exists"))
            }
        };
        Ok(ExecutionReport { policy, execution })
    }

    /// Approve a pending action and close the loop: invoke the executor
    /// with the stored tool and arguments.
    ///
    /// The approval stands even if the subsequent dispatch fails; the
    /// audit record documents the authorization, not the outcome.
    ///
    /// # Errors
    ///
    /// The conditions of
    /// [`ApprovalResolver::resolve`](toolgate_approval::ApprovalResolver::resolve),
    /// plus [`GatewayError::Exec`] when dispatch breaks.
    pub async fn approve_action(&self, id: &PendingActionId) -> GatewayResult<ApprovalReport> {
        let action = self.resolver.resolve(id, Resolution::Approve)?;

        let execution = match self.registry.tool(&action.tool_id)? {
            Some(tool) => Some(
                self.executor
                    .invoke(&tool.server_id, &tool.name, &action.arguments)
                    .await?,
            ),
            None => {
                tracing::warn!(
                    action = %action.id,
                    tool = %action.tool_id,
                    "approved action references a deleted tool; nothing dispatched"
                );
                None
            }
        };
        Ok(ApprovalReport { action, execution })
    }

    /// Deny a pending action.
    ///
    /// # Errors
    ///
    /// The conditions of
    /// [`ApprovalResolver::resolve`](toolgate_approval::ApprovalResolver::resolve).
    pub fn deny_action(&self, id: &PendingActionId) -> GatewayResult<PendingAction> {
        Ok(self.resolver.resolve(id, Resolution::Deny)?)
    }

    /// Approve a set of pending actions, each independently.
    ///
    /// Batch approval authorizes only - nothing is dispatched. Callers
    /// that want execution approve individually.
    ///
    /// # Errors
    ///
    /// [`GatewayError::BatchTooLarge`] when the request exceeds the
    /// configured limit. Per-item failures are reported in the outcome,
    /// never as an error.
    pub async fn batch_approve(&self, ids: &[PendingActionId]) -> GatewayResult<BatchOutcome> {
        if ids.len() > self.batch_limit {
            return Err(GatewayError::BatchTooLarge {
                requested: ids.len(),
                limit: self.batch_limit,
            });
        }
        Ok(self.resolver.batch_resolve(ids, Resolution::Approve).await)
    }

    // ----- administrative pass-throughs -----

    /// Create an agent profile (with default-deny backfill).
    ///
    /// # Errors
    ///
    /// The conditions of [`Registry::create_agent`].
    pub fn create_agent(&self, new: NewAgent) -> GatewayResult<AgentProfile> {
        Ok(self.registry.create_agent(new)?)
    }

    /// All agent profiles.
    ///
    /// # Errors
    ///
    /// The conditions of [`Registry::agents`].
    pub fn agents(&self) -> GatewayResult<Vec<AgentProfile>> {
        Ok(self.registry.agents()?)
    }

    /// Delete an agent: its permission rows and pending actions go with
    /// it; its audit records stay.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AgentNotFound`] if the id does not resolve,
    /// [`GatewayError::Storage`] on persistence failure.
    pub fn delete_agent(&self, id: &AgentId) -> GatewayResult<()> {
        if self.registry.agent(id)?.is_none() {
            return Err(RegistryError::AgentNotFound(*id).into());
        }
        self.pending.delete_for_agent(id)?;
        self.registry.delete_agent(id)?;
        Ok(())
    }

    /// Create a server.
    ///
    /// # Errors
    ///
    /// The conditions of [`Registry::create_server`].
    pub fn create_server(&self, new: NewServer) -> GatewayResult<Server> {
        Ok(self.registry.create_server(new)?)
    }

    /// All servers.
    ///
    /// # Errors
    ///
    /// The conditions of [`Registry::servers`].
    pub fn servers(&self) -> GatewayResult<Vec<Server>> {
        Ok(self.registry.servers()?)
    }

    /// Delete a server with its tools and their permissions.
    ///
    /// # Errors
    ///
    /// The conditions of [`Registry::delete_server`].
    pub fn delete_server(&self, id: &ServerId) -> GatewayResult<()> {
        Ok(self.registry.delete_server(id)?)
    }

    /// Discover tools on a server and register the new ones.
    ///
    /// # Errors
    ///
    /// [`RegistryError::ServerNotFound`] if the id does not resolve,
    /// [`RegistryError::Discovery`] when discovery fails, plus the
    /// conditions of [`Registry::sync_tools`].
    pub fn sync_server(
        &self,
        id: &ServerId,
        discovery: &dyn ToolDiscovery,
    ) -> GatewayResult<SyncReport> {
        let server = self
            .registry
            .server(id)?
            .ok_or(RegistryError::ServerNotFound(*id))?;
        let discovered = discovery.discover(&server)?;
        Ok(self.registry.sync_tools(id, &discovered)?)
    }

    /// Create a tool by hand (with default-deny backfill).
    ///
    /// # Errors
    ///
    /// The conditions of [`Registry::create_tool`].
    pub fn create_tool(&self, new: NewTool) -> GatewayResult<Tool> {
        Ok(self.registry.create_tool(new)?)
    }

    /// All tools.
    ///
    /// # Errors
    ///
    /// The conditions of [`Registry::tools`].
    pub fn tools(&self) -> GatewayResult<Vec<Tool>> {
        Ok(self.registry.tools()?)
    }

    /// Change a tool's risk tier.
    ///
    /// # Errors
    ///
    /// The conditions of [`Registry::set_risk_tier`].
    pub fn set_risk_tier(&self, id: &ToolId, tier: RiskTier) -> GatewayResult<Tool> {
        Ok(self.registry.set_risk_tier(id, tier)?)
    }

    /// Delete a tool and its permission rows.
    ///
    /// # Errors
    ///
    /// The conditions of [`Registry::delete_tool`].
    pub fn delete_tool(&self, id: &ToolId) -> GatewayResult<()> {
        Ok(self.registry.delete_tool(id)?)
    }

    /// Grant one permission (idempotent).
    ///
    /// # Errors
    ///
    /// The conditions of [`Registry::grant`].
    pub fn grant(&self, agent_id: &AgentId, tool_id: &ToolId) -> GatewayResult<()> {
        Ok(self.registry.grant(agent_id, tool_id)?)
    }

    /// Revoke one permission (idempotent).
    ///
    /// # Errors
    ///
    /// The conditions of [`Registry::revoke`].
    pub fn revoke(&self, agent_id: &AgentId, tool_id: &ToolId) -> GatewayResult<()> {
        Ok(self.registry.revoke(agent_id, tool_id)?)
    }

    /// Grant every tool to an agent.
    ///
    /// # Errors
    ///
    /// The conditions of [`Registry::grant_all`].
    pub fn grant_all(&self, agent_id: &AgentId) -> GatewayResult<usize> {
        Ok(self.registry.grant_all(agent_id)?)
    }

    /// Revoke every permission an agent has.
    ///
    /// # Errors
    ///
    /// The conditions of [`Registry::revoke_all`].
    pub fn revoke_all(&self, agent_id: &AgentId) -> GatewayResult<usize> {
        Ok(self.registry.revoke_all(agent_id)?)
    }

    /// All permission rows for an agent.
    ///
    /// # Errors
    ///
    /// The conditions of [`Registry::permissions_for_agent`].
    pub fn permissions_for_agent(&self, agent_id: &AgentId) -> GatewayResult<Vec<ToolPermission>> {
        Ok(self.registry.permissions_for_agent(agent_id)?)
    }

    // ----- projections -----

    /// Actions awaiting approval, decorated for display, newest first.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Storage`] on persistence failure.
    pub fn pending_actions(&self) -> GatewayResult<Vec<PendingActionView>> {
        let actions = self.pending.by_status(PendingStatus::Pending)?;
        let (agents, tools, servers) = self.display_maps()?;
        Ok(actions
            .into_iter()
            .map(|action| {
                let tool = tools.get(&action.tool_id);
                PendingActionView {
                    agent_name: agents.get(&action.agent_id).cloned(),
                    tool_name: tool.map(|(name, _)| name.clone()),
                    server_name: tool.and_then(|(_, sid)| servers.get(sid).cloned()),
                    action,
                }
            })
            .collect())
    }

    /// The audit log, decorated for display, newest first.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Storage`] on persistence failure.
    pub fn audit_log(&self) -> GatewayResult<Vec<AuditRecordView>> {
        let records = self.audit.records()?;
        let (agents, tools, servers) = self.display_maps()?;
        Ok(records
            .into_iter()
            .map(|record| {
                let tool = tools.get(&record.tool_id);
                AuditRecordView {
                    agent_name: agents.get(&record.agent_id).cloned(),
                    tool_name: tool.map(|(name, _)| name.clone()),
                    server_name: tool.and_then(|(_, sid)| servers.get(sid).cloned()),
                    record,
                }
            })
            .collect())
    }

    /// Headline counts.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Storage`] on persistence failure.
    pub fn dashboard(&self) -> GatewayResult<DashboardSummary> {
        Ok(DashboardSummary {
            agents: self.registry.count_agents()?,
            servers: self.registry.count_servers()?,
            tools: self.registry.count_tools()?,
            pending_approvals: self.pending.count_pending()?,
            audit_records: self.audit.count()?,
        })
    }

    /// Name lookup tables for decoration.
    #[allow(clippy::type_complexity)]
    fn display_maps(
        &self,
    ) -> GatewayResult<(
        HashMap<AgentId, String>,
        HashMap<ToolId, (String, ServerId)>,
        HashMap<ServerId, String>,
    )> {
        let agents = self
            .registry
            .agents()?
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect();
        let tools = self
            .registry
            .tools()?
            .into_iter()
            .map(|t| (t.id, (t.name, t.server_id)))
            .collect();
        let servers = self
            .registry
            .servers()?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();
        Ok((agents, tools, servers))
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("batch_limit", &self.batch_limit)
            .finish_non_exhaustive()
    }
}
