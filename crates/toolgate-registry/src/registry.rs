//! Registry service: SQL-backed entity store and permission matrix.

use std::sync::Arc;
use uuid::Uuid;

use toolgate_core::{AgentId, RiskTier, ServerId, Timestamp, ToolId};
use toolgate_storage::rusqlite::types::Type;
use toolgate_storage::rusqlite::{self, OptionalExtension, Row, Transaction, params};
use toolgate_storage::{Db, StorageError, StorageResult};

use crate::discovery::{DiscoveredTool, SyncReport};
use crate::error::{RegistryError, RegistryResult};
use crate::types::{
    AgentProfile, NewAgent, NewServer, NewTool, Server, ServerKind, Tool, ToolPermission,
};

/// Table DDL, applied once at construction.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS agents (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    host_type   TEXT NOT NULL,
    api_key     TEXT,
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS servers (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    kind        TEXT NOT NULL,
    command     TEXT,
    base_url    TEXT,
    description TEXT,
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tools (
    id           TEXT PRIMARY KEY,
    server_id    TEXT NOT NULL,
    name         TEXT NOT NULL,
    description  TEXT,
    input_schema TEXT,
    risk_tier    TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    UNIQUE (server_id, name)
);
CREATE TABLE IF NOT EXISTS tool_permissions (
    agent_id TEXT NOT NULL,
    tool_id  TEXT NOT NULL,
    allowed  INTEGER NOT NULL,
    PRIMARY KEY (agent_id, tool_id)
);
CREATE INDEX IF NOT EXISTS idx_tools_server ON tools (server_id);
CREATE INDEX IF NOT EXISTS idx_permissions_tool ON tool_permissions (tool_id);
";

/// Outcome of a guarded mutation, resolved to an error outside the
/// transaction closure.
enum Guarded<T> {
    Done(T),
    MissingAgent,
    MissingServer,
    MissingTool,
}

/// SQL-backed registry of agents, servers, tools, and permissions.
pub struct Registry {
    db: Arc<Db>,
}

impl Registry {
    /// Create the registry, applying its schema.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] if the DDL cannot be applied.
    pub fn new(db: Arc<Db>) -> RegistryResult<Self> {
        db.with_conn(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })?;
        Ok(Self { db })
    }

    // ----- agents -----

    /// Create an agent profile and backfill default-deny permission rows
    /// for every existing tool.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] on persistence failure.
    pub fn create_agent(&self, new: NewAgent) -> RegistryResult<AgentProfile> {
        let agent = AgentProfile {
            id: AgentId::new(),
            name: new.name,
            description: new.description,
            host_type: new.host_type,
            api_key: new.api_key,
            created_at: Timestamp::now(),
        };
        let backfilled = self.db.transaction(|tx| {
            tx.execute(
                "INSERT INTO agents (id, name, description, host_type, api_key, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    agent.id.as_uuid().to_string(),
                    agent.name,
                    agent.description,
                    agent.host_type,
                    agent.api_key,
                    agent.created_at.to_rfc3339(),
                ],
            )?;
            let backfilled = tx.execute(
                "INSERT OR IGNORE INTO tool_permissions (agent_id, tool_id, allowed)
                 SELECT ?1, id, 0 FROM tools",
                params![agent.id.as_uuid().to_string()],
            )?;
            Ok(backfilled)
        })?;
        tracing::info!(agent = %agent.id, name = %agent.name, backfilled, "agent profile created");
        Ok(agent)
    }

    /// Look up an agent profile.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] on persistence failure.
    pub fn agent(&self, id: &AgentId) -> RegistryResult<Option<AgentProfile>> {
        let out = self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, name, description, host_type, api_key, created_at
                     FROM agents WHERE id = ?1",
                    params![id.as_uuid().to_string()],
                    agent_from_row,
                )
                .optional()?)
        })?;
        Ok(out)
    }

    /// All agent profiles, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] on persistence failure.
    pub fn agents(&self) -> RegistryResult<Vec<AgentProfile>> {
        let out = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, host_type, api_key, created_at
                 FROM agents ORDER BY name ASC",
            )?;
            let rows = stmt.query_map([], agent_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        Ok(out)
    }

    /// Delete an agent profile and its permission rows.
    ///
    /// Pending actions and audit records referencing the agent are NOT
    /// touched here; the audit log is immutable by contract and the
    /// pending-action cascade is the gateway's job (it owns both stores).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AgentNotFound`] if the id does not
    /// resolve, [`RegistryError::Storage`] on persistence failure.
    pub fn delete_agent(&self, id: &AgentId) -> RegistryResult<()> {
        let guarded = self.db.transaction(|tx| {
            let key = id.as_uuid().to_string();
            tx.execute(
                "DELETE FROM tool_permissions WHERE agent_id = ?1",
                params![key],
            )?;
            let deleted = tx.execute("DELETE FROM agents WHERE id = ?1", params![key])?;
            if deleted == 0 {
                return Ok(Guarded::MissingAgent);
            }
            Ok(Guarded::Done(()))
        })?;
        match guarded {
            Guarded::Done(()) => {
                tracing::info!(agent = %id, "agent profile deleted");
                Ok(())
            }
            _ => Err(RegistryError::AgentNotFound(*id)),
        }
    }

    // ----- servers -----

    /// Create a server.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] on persistence failure.
    pub fn create_server(&self, new: NewServer) -> RegistryResult<Server> {
        let server = Server {
            id: ServerId::new(),
            name: new.name,
            kind: new.kind,
            command: new.command,
            base_url: new.base_url,
            description: new.description,
            created_at: Timestamp::now(),
        };
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO servers (id, name, kind, command, base_url, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    server.id.as_uuid().to_string(),
                    server.name,
                    server.kind.as_str(),
                    server.command,
                    server.base_url,
                    server.description,
                    server.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })?;
        tracing::info!(server = %server.id, name = %server.name, kind = %server.kind, "server created");
        Ok(server)
    }

    /// Look up a server.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] on persistence failure.
    pub fn server(&self, id: &ServerId) -> RegistryResult<Option<Server>> {
        let out = self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, name, kind, command, base_url, description, created_at
                     FROM servers WHERE id = ?1",
                    params![id.as_uuid().to_string()],
                    server_from_row,
                )
                .optional()?)
        })?;
        Ok(out)
    }

    /// All servers, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] on persistence failure.
    pub fn servers(&self) -> RegistryResult<Vec<Server>> {
        let out = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, kind, command, base_url, description, created_at
                 FROM servers ORDER BY name ASC",
            )?;
            let rows = stmt.query_map([], server_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        Ok(out)
    }

    /// Delete a server, its tools, and their permission rows.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ServerNotFound`] if the id does not
    /// resolve, [`RegistryError::Storage`] on persistence failure.
    pub fn delete_server(&self, id: &ServerId) -> RegistryResult<()> {
        let guarded = self.db.transaction(|tx| {
            let key = id.as_uuid().to_string();
            tx.execute(
                "DELETE FROM tool_permissions
                 WHERE tool_id IN (SELECT id FROM tools WHERE server_id = ?1)",
                params![key],
            )?;
            tx.execute("DELETE FROM tools WHERE server_id = ?1", params![key])?;
            let deleted = tx.execute("DELETE FROM servers WHERE id = ?1", params![key])?;
            if deleted == 0 {
                return Ok(Guarded::MissingServer);
            }
            Ok(Guarded::Done(()))
        })?;
        match guarded {
            Guarded::Done(()) => {
                tracing::info!(server = %id, "server deleted");
                Ok(())
            }
            _ => Err(RegistryError::ServerNotFound(*id)),
        }
    }

    // ----- tools -----

    /// Create a tool and backfill default-deny permission rows for every
    /// existing agent. The risk tier defaults to `needs_approval`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ServerNotFound`] if the owning server
    /// does not exist, [`RegistryError::DuplicateToolName`] if the
    /// (server, name) pair is taken, [`RegistryError::Storage`] on
    /// persistence failure.
    pub fn create_tool(&self, new: NewTool) -> RegistryResult<Tool> {
        let tool = Tool {
            id: ToolId::new(),
            server_id: new.server_id,
            name: new.name,
            description: new.description,
            input_schema: new.input_schema,
            risk_tier: new.risk_tier.unwrap_or(RiskTier::NeedsApproval),
            created_at: Timestamp::now(),
        };
        let result = self.db.transaction(|tx| {
            if !server_exists(tx, &tool.server_id)? {
                return Ok(Guarded::MissingServer);
            }
            insert_tool(tx, &tool)?;
            let backfilled = backfill_tool_permissions(tx, &tool.id)?;
            Ok(Guarded::Done(backfilled))
        });
        match result {
            Ok(Guarded::Done(backfilled)) => {
                tracing::info!(
                    tool = %tool.id,
                    name = %tool.name,
                    tier = %tool.risk_tier,
                    backfilled,
                    "tool created"
                );
                Ok(tool)
            }
            Ok(_) => Err(RegistryError::ServerNotFound(tool.server_id)),
            Err(e) if is_unique_violation(&e) => Err(RegistryError::DuplicateToolName {
                server: tool.server_id,
                name: tool.name,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a tool.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] on persistence failure.
    pub fn tool(&self, id: &ToolId) -> RegistryResult<Option<Tool>> {
        let out = self.db.transaction(|tx| Self::tool_tx(tx, id))?;
        Ok(out)
    }

    /// All tools, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] on persistence failure.
    pub fn tools(&self) -> RegistryResult<Vec<Tool>> {
        let out = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, server_id, name, description, input_schema, risk_tier, created_at
                 FROM tools ORDER BY name ASC",
            )?;
            let rows = stmt.query_map([], tool_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        Ok(out)
    }

    /// Tools owned by one server, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] on persistence failure.
    pub fn tools_for_server(&self, server_id: &ServerId) -> RegistryResult<Vec<Tool>> {
        let out = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, server_id, name, description, input_schema, risk_tier, created_at
                 FROM tools WHERE server_id = ?1 ORDER BY name ASC",
            )?;
            let rows = stmt.query_map(params![server_id.as_uuid().to_string()], tool_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        Ok(out)
    }

    /// Change a tool's risk tier. Takes effect on the next evaluation;
    /// in-flight pending actions are not revisited.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ToolNotFound`] if the id does not
    /// resolve, [`RegistryError::Storage`] on persistence failure.
    pub fn set_risk_tier(&self, id: &ToolId, tier: RiskTier) -> RegistryResult<Tool> {
        let guarded = self.db.transaction(|tx| {
            let updated = tx.execute(
                "UPDATE tools SET risk_tier = ?1 WHERE id = ?2",
                params![tier.as_str(), id.as_uuid().to_string()],
            )?;
            if updated == 0 {
                return Ok(Guarded::MissingTool);
            }
            match Self::tool_tx(tx, id)? {
                Some(tool) => Ok(Guarded::Done(tool)),
                None => Ok(Guarded::MissingTool),
            }
        })?;
        match guarded {
            Guarded::Done(tool) => {
                tracing::info!(tool = %id, tier = %tier, "risk tier updated");
                Ok(tool)
            }
            _ => Err(RegistryError::ToolNotFound(*id)),
        }
    }

    /// Delete a tool and its permission rows.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ToolNotFound`] if the id does not
    /// resolve, [`RegistryError::Storage`] on persistence failure.
    pub fn delete_tool(&self, id: &ToolId) -> RegistryResult<()> {
        let guarded = self.db.transaction(|tx| {
            let key = id.as_uuid().to_string();
            tx.execute(
                "DELETE FROM tool_permissions WHERE tool_id = ?1",
                params![key],
            )?;
            let deleted = tx.execute("DELETE FROM tools WHERE id = ?1", params![key])?;
            if deleted == 0 {
                return Ok(Guarded::MissingTool);
            }
            Ok(Guarded::Done(()))
        })?;
        match guarded {
            Guarded::Done(()) => {
                tracing::info!(tool = %id, "tool deleted");
                Ok(())
            }
            _ => Err(RegistryError::ToolNotFound(*id)),
        }
    }

    /// Insert tools discovered on a server, skipping names that already
    /// exist there. New tools default to `needs_approval` and get
    /// default-deny permission rows for every agent.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ServerNotFound`] if the server does not
    /// exist, [`RegistryError::Storage`] on persistence failure.
    pub fn sync_tools(
        &self,
        server_id: &ServerId,
        discovered: &[DiscoveredTool],
    ) -> RegistryResult<SyncReport> {
        let guarded = self.db.transaction(|tx| {
            if !server_exists(tx, server_id)? {
                return Ok(Guarded::MissingServer);
            }
            let mut report = SyncReport::default();
            for item in discovered {
                let exists: bool = tx
                    .query_row(
                        "SELECT 1 FROM tools WHERE server_id = ?1 AND name = ?2",
                        params![server_id.as_uuid().to_string(), item.name],
                        |_| Ok(()),
                    )
                    .optional()?
                    .is_some();
                if exists {
                    report.skipped = report.skipped.saturating_add(1);
                    continue;
                }
                let tool = Tool {
                    id: ToolId::new(),
                    server_id: *server_id,
                    name: item.name.clone(),
                    description: item.description.clone(),
                    input_schema: item.input_schema.clone(),
                    risk_tier: RiskTier::NeedsApproval,
                    created_at: Timestamp::now(),
                };
                insert_tool(tx, &tool)?;
                backfill_tool_permissions(tx, &tool.id)?;
                report.added = report.added.saturating_add(1);
            }
            Ok(Guarded::Done(report))
        })?;
        match guarded {
            Guarded::Done(report) => {
                tracing::info!(
                    server = %server_id,
                    added = report.added,
                    skipped = report.skipped,
                    "tool sync finished"
                );
                Ok(report)
            }
            _ => Err(RegistryError::ServerNotFound(*server_id)),
        }
    }

    // ----- permissions -----

    /// Grant an agent access to a tool (idempotent upsert).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AgentNotFound`] /
    /// [`RegistryError::ToolNotFound`] for dangling references,
    /// [`RegistryError::Storage`] on persistence failure.
    pub fn grant(&self, agent_id: &AgentId, tool_id: &ToolId) -> RegistryResult<()> {
        self.set_permission(agent_id, tool_id, true)
    }

    /// Revoke an agent's access to a tool (idempotent upsert).
    ///
    /// # Errors
    ///
    /// Same conditions as [`Registry::grant`].
    pub fn revoke(&self, agent_id: &AgentId, tool_id: &ToolId) -> RegistryResult<()> {
        self.set_permission(agent_id, tool_id, false)
    }

    fn set_permission(
        &self,
        agent_id: &AgentId,
        tool_id: &ToolId,
        allowed: bool,
    ) -> RegistryResult<()> {
        let guarded = self.db.transaction(|tx| {
            if !agent_exists(tx, agent_id)? {
                return Ok(Guarded::MissingAgent);
            }
            if Self::tool_tx(tx, tool_id)?.is_none() {
                return Ok(Guarded::MissingTool);
            }
            tx.execute(
                "INSERT INTO tool_permissions (agent_id, tool_id, allowed)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (agent_id, tool_id) DO UPDATE SET allowed = excluded.allowed",
                params![
                    agent_id.as_uuid().to_string(),
                    tool_id.as_uuid().to_string(),
                    i64::from(allowed),
                ],
            )?;
            Ok(Guarded::Done(()))
        })?;
        match guarded {
            Guarded::Done(()) => {
                tracing::debug!(agent = %agent_id, tool = %tool_id, allowed, "permission set");
                Ok(())
            }
            Guarded::MissingAgent => Err(RegistryError::AgentNotFound(*agent_id)),
            _ => Err(RegistryError::ToolNotFound(*tool_id)),
        }
    }

    /// Grant an agent access to every tool. Returns the number of rows
    /// now allowed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AgentNotFound`] if the agent does not
    /// exist, [`RegistryError::Storage`] on persistence failure.
    pub fn grant_all(&self, agent_id: &AgentId) -> RegistryResult<usize> {
        let guarded = self.db.transaction(|tx| {
            if !agent_exists(tx, agent_id)? {
                return Ok(Guarded::MissingAgent);
            }
            let granted = tx.execute(
                "INSERT INTO tool_permissions (agent_id, tool_id, allowed)
                 SELECT ?1, id, 1 FROM tools WHERE true
                 ON CONFLICT (agent_id, tool_id) DO UPDATE SET allowed = 1",
                params![agent_id.as_uuid().to_string()],
            )?;
            Ok(Guarded::Done(granted))
        })?;
        match guarded {
            Guarded::Done(granted) => {
                tracing::info!(agent = %agent_id, granted, "granted all permissions");
                Ok(granted)
            }
            _ => Err(RegistryError::AgentNotFound(*agent_id)),
        }
    }

    /// Revoke every permission the agent has. Rows are kept with
    /// `allowed=false` (absent and explicit-false deny identically).
    /// Returns the number of rows flipped.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AgentNotFound`] if the agent does not
    /// exist, [`RegistryError::Storage`] on persistence failure.
    pub fn revoke_all(&self, agent_id: &AgentId) -> RegistryResult<usize> {
        let guarded = self.db.transaction(|tx| {
            if !agent_exists(tx, agent_id)? {
                return Ok(Guarded::MissingAgent);
            }
            let revoked = tx.execute(
                "UPDATE tool_permissions SET allowed = 0 WHERE agent_id = ?1",
                params![agent_id.as_uuid().to_string()],
            )?;
            Ok(Guarded::Done(revoked))
        })?;
        match guarded {
            Guarded::Done(revoked) => {
                tracing::info!(agent = %agent_id, revoked, "revoked all permissions");
                Ok(revoked)
            }
            _ => Err(RegistryError::AgentNotFound(*agent_id)),
        }
    }

    /// The permission state for one (agent, tool) pair, if a row exists.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] on persistence failure.
    pub fn permission(&self, agent_id: &AgentId, tool_id: &ToolId) -> RegistryResult<Option<bool>> {
        let out = self
            .db
            .transaction(|tx| Self::permission_tx(tx, agent_id, tool_id))?;
        Ok(out)
    }

    /// All permission rows for one agent.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] on persistence failure.
    pub fn permissions_for_agent(&self, agent_id: &AgentId) -> RegistryResult<Vec<ToolPermission>> {
        let out = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT agent_id, tool_id, allowed FROM tool_permissions
                 WHERE agent_id = ?1 ORDER BY tool_id ASC",
            )?;
            let rows = stmt.query_map(params![agent_id.as_uuid().to_string()], |row| {
                Ok(ToolPermission {
                    agent_id: AgentId::from_uuid(uuid_col(row, 0)?),
                    tool_id: ToolId::from_uuid(uuid_col(row, 1)?),
                    allowed: row.get::<_, i64>(2)? != 0,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        Ok(out)
    }

    // ----- counts -----

    /// Number of agent profiles.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] on persistence failure.
    pub fn count_agents(&self) -> RegistryResult<usize> {
        self.count_table("agents")
    }

    /// Number of servers.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] on persistence failure.
    pub fn count_servers(&self) -> RegistryResult<usize> {
        self.count_table("servers")
    }

    /// Number of tools.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] on persistence failure.
    pub fn count_tools(&self) -> RegistryResult<usize> {
        self.count_table("tools")
    }

    fn count_table(&self, table: &str) -> RegistryResult<usize> {
        let out = self.db.with_conn(|conn| {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })?;
        Ok(out)
    }

    // ----- transaction-scoped reads (used by the policy engine) -----

    /// Look up a tool inside an open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] on query failure.
    pub fn tool_tx(tx: &Transaction<'_>, id: &ToolId) -> StorageResult<Option<Tool>> {
        Ok(tx
            .query_row(
                "SELECT id, server_id, name, description, input_schema, risk_tier, created_at
                 FROM tools WHERE id = ?1",
                params![id.as_uuid().to_string()],
                tool_from_row,
            )
            .optional()?)
    }

    /// Look up a permission row inside an open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] on query failure.
    pub fn permission_tx(
        tx: &Transaction<'_>,
        agent_id: &AgentId,
        tool_id: &ToolId,
    ) -> StorageResult<Option<bool>> {
        Ok(tx
            .query_row(
                "SELECT allowed FROM tool_permissions WHERE agent_id = ?1 AND tool_id = ?2",
                params![
                    agent_id.as_uuid().to_string(),
                    tool_id.as_uuid().to_string()
                ],
                |row| Ok(row.get::<_, i64>(0)? != 0),
            )
            .optional()?)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}

// ----- row mapping -----

fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Timestamp> {
    let text: String = row.get(idx)?;
    Timestamp::parse_rfc3339(&text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp: {text}").into(),
        )
    })
}

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<AgentProfile> {
    Ok(AgentProfile {
        id: AgentId::from_uuid(uuid_col(row, 0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        host_type: row.get(3)?,
        api_key: row.get(4)?,
        created_at: timestamp_col(row, 5)?,
    })
}

fn server_from_row(row: &Row<'_>) -> rusqlite::Result<Server> {
    let kind_text: String = row.get(2)?;
    let kind = ServerKind::parse(&kind_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("invalid server kind: {kind_text}").into(),
        )
    })?;
    Ok(Server {
        id: ServerId::from_uuid(uuid_col(row, 0)?),
        name: row.get(1)?,
        kind,
        command: row.get(3)?,
        base_url: row.get(4)?,
        description: row.get(5)?,
        created_at: timestamp_col(row, 6)?,
    })
}

fn tool_from_row(row: &Row<'_>) -> rusqlite::Result<Tool> {
    let tier_text: String = row.get(5)?;
    Ok(Tool {
        id: ToolId::from_uuid(uuid_col(row, 0)?),
        server_id: ServerId::from_uuid(uuid_col(row, 1)?),
        name: row.get(2)?,
        description: row.get(3)?,
        input_schema: row.get(4)?,
        // Unrecognized tier text maps to Unknown; the engine denies it.
        risk_tier: RiskTier::parse_lenient(&tier_text),
        created_at: timestamp_col(row, 6)?,
    })
}

// ----- transaction-scoped helpers -----

fn agent_exists(tx: &Transaction<'_>, id: &AgentId) -> StorageResult<bool> {
    Ok(tx
        .query_row(
            "SELECT 1 FROM agents WHERE id = ?1",
            params![id.as_uuid().to_string()],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn server_exists(tx: &Transaction<'_>, id: &ServerId) -> StorageResult<bool> {
    Ok(tx
        .query_row(
            "SELECT 1 FROM servers WHERE id = ?1",
            params![id.as_uuid().to_string()],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn insert_tool(tx: &Transaction<'_>, tool: &Tool) -> StorageResult<()> {
    tx.execute(
        "INSERT INTO tools (id, server_id, name, description, input_schema, risk_tier, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            tool.id.as_uuid().to_string(),
            tool.server_id.as_uuid().to_string(),
            tool.name,
            tool.description,
            tool.input_schema,
            tool.risk_tier.as_str(),
            tool.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn backfill_tool_permissions(tx: &Transaction<'_>, tool_id: &ToolId) -> StorageResult<usize> {
    Ok(tx.execute(
        "INSERT OR IGNORE INTO tool_permissions (agent_id, tool_id, allowed)
         SELECT id, ?1, 0 FROM agents",
        params![tool_id.as_uuid().to_string()],
    )?)
}

fn is_unique_violation(err: &StorageError) -> bool {
    match err {
        StorageError::Database(rusqlite::Error::SqliteFailure(e, _)) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new(Arc::new(Db::in_memory().unwrap())).unwrap()
    }

    fn sample_agent(registry: &Registry) -> AgentProfile {
        registry
            .create_agent(NewAgent {
                name: "assistant".to_string(),
                description: None,
                host_type: "claude-desktop".to_string(),
                api_key: None,
            })
            .unwrap()
    }

    fn sample_server(registry: &Registry) -> Server {
        registry
            .create_server(NewServer {
                name: "filesystem".to_string(),
                kind: ServerKind::Mcp,
                command: Some("npx mcp-fs".to_string()),
                base_url: None,
                description: None,
            })
            .unwrap()
    }

    fn sample_tool(registry: &Registry, server: &Server, name: &str, tier: RiskTier) -> Tool {
        registry
            .create_tool(NewTool {
                server_id: server.id,
                name: name.to_string(),
                description: None,
                input_schema: None,
                risk_tier: Some(tier),
            })
            .unwrap()
    }

    #[test]
    fn test_agent_roundtrip() {
        let registry = registry();
        let agent = sample_agent(&registry);

        let loaded = registry.agent(&agent.id).unwrap().unwrap();
        assert_eq!(loaded.name, "assistant");
        assert_eq!(loaded.host_type, "claude-desktop");
        assert!(registry.agent(&AgentId::new()).unwrap().is_none());
    }

    #[test]
    fn test_new_agent_backfills_default_deny() {
        let registry = registry();
        let server = sample_server(&registry);
        sample_tool(&registry, &server, "read_file", RiskTier::Safe);
        sample_tool(&registry, &server, "write_file", RiskTier::NeedsApproval);

        let agent = sample_agent(&registry);

        let permissions = registry.permissions_for_agent(&agent.id).unwrap();
        assert_eq!(permissions.len(), 2);
        assert!(permissions.iter().all(|p| !p.allowed));
    }

    #[test]
    fn test_new_tool_backfills_default_deny() {
        let registry = registry();
        let a = sample_agent(&registry);
        let b = sample_agent(&registry);
        let server = sample_server(&registry);
        let tool = sample_tool(&registry, &server, "read_file", RiskTier::Safe);

        assert_eq!(registry.permission(&a.id, &tool.id).unwrap(), Some(false));
        assert_eq!(registry.permission(&b.id, &tool.id).unwrap(), Some(false));
    }

    #[test]
    fn test_duplicate_tool_name_rejected() {
        let registry = registry();
        let server = sample_server(&registry);
        sample_tool(&registry, &server, "read_file", RiskTier::Safe);

        let err = registry
            .create_tool(NewTool {
                server_id: server.id,
                name: "read_file".to_string(),
                description: None,
                input_schema: None,
                risk_tier: None,
            })
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateToolName { .. }));
    }

    #[test]
    fn test_tool_defaults_to_needs_approval() {
        let registry = registry();
        let server = sample_server(&registry);
        let tool = registry
            .create_tool(NewTool {
                server_id: server.id,
                name: "mystery".to_string(),
                description: None,
                input_schema: None,
                risk_tier: None,
            })
            .unwrap();
        assert_eq!(tool.risk_tier, RiskTier::NeedsApproval);
    }

    #[test]
    fn test_grant_is_idempotent() {
        let registry = registry();
        let agent = sample_agent(&registry);
        let server = sample_server(&registry);
        let tool = sample_tool(&registry, &server, "read_file", RiskTier::Safe);

        registry.grant(&agent.id, &tool.id).unwrap();
        registry.grant(&agent.id, &tool.id).unwrap();

        let permissions = registry.permissions_for_agent(&agent.id).unwrap();
        assert_eq!(permissions.len(), 1);
        assert!(permissions[0].allowed);
    }

    #[test]
    fn test_grant_unknown_refs() {
        let registry = registry();
        let agent = sample_agent(&registry);
        let server = sample_server(&registry);
        let tool = sample_tool(&registry, &server, "read_file", RiskTier::Safe);

        assert!(matches!(
            registry.grant(&AgentId::new(), &tool.id),
            Err(RegistryError::AgentNotFound(_))
        ));
        assert!(matches!(
            registry.grant(&agent.id, &ToolId::new()),
            Err(RegistryError::ToolNotFound(_))
        ));
    }

    #[test]
    fn test_grant_all_revoke_all() {
        let registry = registry();
        let agent = sample_agent(&registry);
        let server = sample_server(&registry);
        sample_tool(&registry, &server, "a", RiskTier::Safe);
        sample_tool(&registry, &server, "b", RiskTier::Safe);
        sample_tool(&registry, &server, "c", RiskTier::Blocked);

        let granted = registry.grant_all(&agent.id).unwrap();
        assert_eq!(granted, 3);
        assert!(
            registry
                .permissions_for_agent(&agent.id)
                .unwrap()
                .iter()
                .all(|p| p.allowed)
        );

        let revoked = registry.revoke_all(&agent.id).unwrap();
        assert_eq!(revoked, 3);
        let permissions = registry.permissions_for_agent(&agent.id).unwrap();
        // Rows stay present, flipped to deny.
        assert_eq!(permissions.len(), 3);
        assert!(permissions.iter().all(|p| !p.allowed));
    }

    #[test]
    fn test_set_risk_tier() {
        let registry = registry();
        let server = sample_server(&registry);
        let tool = sample_tool(&registry, &server, "read_file", RiskTier::Safe);

        let updated = registry
            .set_risk_tier(&tool.id, RiskTier::Blocked)
            .unwrap();
        assert_eq!(updated.risk_tier, RiskTier::Blocked);

        assert!(matches!(
            registry.set_risk_tier(&ToolId::new(), RiskTier::Safe),
            Err(RegistryError::ToolNotFound(_))
        ));
    }

    #[test]
    fn test_sync_tools_is_idempotent() {
        let registry = registry();
        let agent = sample_agent(&registry);
        let server = sample_server(&registry);
        let discovered = vec![
            DiscoveredTool::new("fs_read_file"),
            DiscoveredTool::new("fs_write_file"),
        ];

        let first = registry.sync_tools(&server.id, &discovered).unwrap();
        assert_eq!((first.added, first.skipped), (2, 0));

        let second = registry.sync_tools(&server.id, &discovered).unwrap();
        assert_eq!((second.added, second.skipped), (0, 2));

        // Synced tools arrive approval-gated and default-denied.
        let tools = registry.tools_for_server(&server.id).unwrap();
        assert_eq!(tools.len(), 2);
        assert!(
            tools
                .iter()
                .all(|t| t.risk_tier == RiskTier::NeedsApproval)
        );
        assert_eq!(
            registry.permissions_for_agent(&agent.id).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_delete_agent_cascades_permissions() {
        let registry = registry();
        let agent = sample_agent(&registry);
        let server = sample_server(&registry);
        let tool = sample_tool(&registry, &server, "read_file", RiskTier::Safe);
        registry.grant(&agent.id, &tool.id).unwrap();

        registry.delete_agent(&agent.id).unwrap();

        assert!(registry.agent(&agent.id).unwrap().is_none());
        assert!(registry.permission(&agent.id, &tool.id).unwrap().is_none());
        assert!(matches!(
            registry.delete_agent(&agent.id),
            Err(RegistryError::AgentNotFound(_))
        ));
    }

    #[test]
    fn test_delete_server_cascades_tools_and_permissions() {
        let registry = registry();
        let agent = sample_agent(&registry);
        let server = sample_server(&registry);
        let tool = sample_tool(&registry, &server, "read_file", RiskTier::Safe);

        registry.delete_server(&server.id).unwrap();

        assert!(registry.tool(&tool.id).unwrap().is_none());
        assert!(registry.permission(&agent.id, &tool.id).unwrap().is_none());
    }

    #[test]
    fn test_counts() {
        let registry = registry();
        sample_agent(&registry);
        let server = sample_server(&registry);
        sample_tool(&registry, &server, "read_file", RiskTier::Safe);

        assert_eq!(registry.count_agents().unwrap(), 1);
        assert_eq!(registry.count_servers().unwrap(), 1);
        assert_eq!(registry.count_tools().unwrap(), 1);
    }
}
