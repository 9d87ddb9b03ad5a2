//! SQL-backed pending action store.

use std::sync::Arc;
use uuid::Uuid;

use toolgate_core::{AgentId, PendingActionId, Timestamp, ToolId};
use toolgate_storage::rusqlite::types::Type;
use toolgate_storage::rusqlite::{self, OptionalExtension, Row, Transaction, params};
use toolgate_storage::{Db, StorageResult};

use crate::action::{PendingAction, PendingStatus};
use crate::error::ApprovalResult;

/// Table DDL, applied once at construction.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS pending_actions (
    id         TEXT PRIMARY KEY,
    agent_id   TEXT NOT NULL,
    tool_id    TEXT NOT NULL,
    arguments  TEXT NOT NULL,
    status     TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_pending_status ON pending_actions (status);
CREATE INDEX IF NOT EXISTS idx_pending_agent ON pending_actions (agent_id);
";

/// Outcome of a transaction-scoped resolution attempt.
pub(crate) enum ResolveTx {
    /// No row with this id.
    NotFound,
    /// The row exists but is already terminal.
    NotPending(PendingStatus),
    /// Transitioned; the returned action carries the new status.
    Resolved(PendingAction),
}

/// Durable queue of deferred decisions.
///
/// Rows are inserted by the policy engine and transitioned by the
/// approval resolver; nothing else writes here.
#[derive(Clone)]
pub struct PendingStore {
    db: Arc<Db>,
}

impl PendingStore {
    /// Create the store, applying its schema.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PolicyError::Storage`] if the DDL cannot be applied.
    pub fn new(db: Arc<Db>) -> ApprovalResult<Self> {
        db.with_conn(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })?;
        Ok(Self { db })
    }

    /// Insert a fresh action inside an open transaction.
    pub(crate) fn insert_tx(tx: &Transaction<'_>, action: &PendingAction) -> StorageResult<()> {
        tx.execute(
            "INSERT INTO pending_actions (id, agent_id, tool_id, arguments, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                action.id.as_uuid().to_string(),
                action.agent_id.as_uuid().to_string(),
                action.tool_id.as_uuid().to_string(),
                action.arguments,
                action.status.as_str(),
                action.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Attempt `pending -> status` inside an open transaction.
    ///
    /// The update is conditional on the row still being `pending`, so
    /// two concurrent resolutions cannot both succeed: the second sees
    /// zero affected rows and reports the terminal state it lost to.
    pub(crate) fn resolve_tx(
        tx: &Transaction<'_>,
        id: &PendingActionId,
        status: PendingStatus,
    ) -> StorageResult<ResolveTx> {
        let key = id.as_uuid().to_string();
        let updated = tx.execute(
            "UPDATE pending_actions SET status = ?1 WHERE id = ?2 AND status = 'pending'",
            params![status.as_str(), key],
        )?;
        if updated == 0 {
            return match Self::get_tx(tx, id)? {
                None => Ok(ResolveTx::NotFound),
                Some(action) => Ok(ResolveTx::NotPending(action.status)),
            };
        }
        match Self::get_tx(tx, id)? {
            Some(action) => Ok(ResolveTx::Resolved(action)),
            // The row we just updated must exist inside this transaction.
            None => Ok(ResolveTx::NotFound),
        }
    }

    /// Look up an action inside an open transaction.
    pub(crate) fn get_tx(
        tx: &Transaction<'_>,
        id: &PendingActionId,
    ) -> StorageResult<Option<PendingAction>> {
        Ok(tx
            .query_row(
                "SELECT id, agent_id, tool_id, arguments, status, created_at
                 FROM pending_actions WHERE id = ?1",
                params![id.as_uuid().to_string()],
                action_from_row,
            )
            .optional()?)
    }

    /// Look up an action.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PolicyError::Storage`] on persistence failure.
    pub fn get(&self, id: &PendingActionId) -> ApprovalResult<Option<PendingAction>> {
        let out = self.db.transaction(|tx| Self::get_tx(tx, id))?;
        Ok(out)
    }

    /// Actions awaiting a decision, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PolicyError::Storage`] on persistence failure.
    pub fn pending(&self) -> ApprovalResult<Vec<PendingAction>> {
        self.by_status(PendingStatus::Pending)
    }

    /// Actions in the given state, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PolicyError::Storage`] on persistence failure.
    pub fn by_status(&self, status: PendingStatus) -> ApprovalResult<Vec<PendingAction>> {
        let out = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, agent_id, tool_id, arguments, status, created_at
                 FROM pending_actions WHERE status = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt.query_map(params![status.as_str()], action_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        Ok(out)
    }

    /// Number of actions awaiting a decision.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PolicyError::Storage`] on persistence failure.
    pub fn count_pending(&self) -> ApprovalResult<usize> {
        let out = self.db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM pending_actions WHERE status = 'pending'",
                [],
                |r| r.get(0),
            )?;
            Ok(usize::try_from(count).unwrap_or(0))
        })?;
        Ok(out)
    }

    /// Delete every action belonging to an agent (agent-deletion
    /// cascade). Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PolicyError::Storage`] on persistence failure.
    pub fn delete_for_agent(&self, agent_id: &AgentId) -> ApprovalResult<usize> {
        let removed = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM pending_actions WHERE agent_id = ?1",
                params![agent_id.as_uuid().to_string()],
            )?)
        })?;
        if removed > 0 {
            tracing::info!(agent = %agent_id, removed, "pending actions removed with agent");
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for PendingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingStore").finish_non_exhaustive()
    }
}

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<PendingAction> {
    let status_text: String = row.get(4)?;
    let time_text: String = row.get(5)?;
    Ok(PendingAction {
        id: PendingActionId::from_uuid(uuid_col(row, 0)?),
        agent_id: AgentId::from_uuid(uuid_col(row, 1)?),
        tool_id: ToolId::from_uuid(uuid_col(row, 2)?),
        arguments: row.get(3)?,
        status: PendingStatus::parse(&status_text)
            .ok_or_else(|| corrupt_col(4, format!("invalid pending status: {status_text}")))?,
        created_at: Timestamp::parse_rfc3339(&time_text)
            .ok_or_else(|| corrupt_col(5, format!("invalid timestamp: {time_text}")))?,
    })
}

fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn corrupt_col(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}
