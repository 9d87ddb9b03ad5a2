//! SQL-backed audit log.

use std::sync::Arc;
use uuid::Uuid;

use toolgate_core::{AgentId, AuditRecordId, DecisionStatus, ReasonCode, Timestamp, ToolId};
use toolgate_storage::rusqlite::types::Type;
use toolgate_storage::rusqlite::{self, Row, Transaction, params};
use toolgate_storage::{Db, StorageResult};

use crate::error::AuditResult;
use crate::record::AuditRecord;

/// Table DDL, applied once at construction.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS action_log (
    id        TEXT PRIMARY KEY,
    agent_id  TEXT NOT NULL,
    tool_id   TEXT NOT NULL,
    arguments TEXT NOT NULL,
    status    TEXT NOT NULL,
    reason    TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_action_log_agent ON action_log (agent_id);
CREATE INDEX IF NOT EXISTS idx_action_log_time ON action_log (timestamp);
";

/// Append-only audit log over the shared database.
pub struct AuditLog {
    db: Arc<Db>,
}

impl AuditLog {
    /// Create the log, applying its schema.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditError::Storage`] if the DDL cannot be applied.
    pub fn new(db: Arc<Db>) -> AuditResult<Self> {
        db.with_conn(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })?;
        Ok(Self { db })
    }

    /// Append a record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditError::Storage`] on persistence failure.
    pub fn append(&self, record: &AuditRecord) -> AuditResult<AuditRecordId> {
        self.db.transaction(|tx| self.append_tx(tx, record))?;
        tracing::debug!(record = %record.id, status = %record.status, reason = %record.reason, "audit record appended");
        Ok(record.id)
    }

    /// Append a record inside an open transaction.
    ///
    /// This is the hook the policy engine and approval resolver use so
    /// the audit write commits (or rolls back) together with the state
    /// change it documents.
    ///
    /// # Errors
    ///
    /// Returns [`toolgate_storage::StorageError::Database`] on statement
    /// failure.
    pub fn append_tx(&self, tx: &Transaction<'_>, record: &AuditRecord) -> StorageResult<()> {
        tx.execute(
            "INSERT INTO action_log (id, agent_id, tool_id, arguments, status, reason, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.as_uuid().to_string(),
                record.agent_id.as_uuid().to_string(),
                record.tool_id.as_uuid().to_string(),
                record.arguments,
                record.status.as_str(),
                record.reason.as_str(),
                record.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All records, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditError::Storage`] on persistence failure.
    pub fn records(&self) -> AuditResult<Vec<AuditRecord>> {
        let out = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, agent_id, tool_id, arguments, status, reason, timestamp
                 FROM action_log ORDER BY timestamp DESC, id DESC",
            )?;
            let rows = stmt.query_map([], record_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        Ok(out)
    }

    /// Records for one agent, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditError::Storage`] on persistence failure.
    pub fn records_for_agent(&self, agent_id: &AgentId) -> AuditResult<Vec<AuditRecord>> {
        let out = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, agent_id, tool_id, arguments, status, reason, timestamp
                 FROM action_log WHERE agent_id = ?1 ORDER BY timestamp DESC, id DESC",
            )?;
            let rows = stmt.query_map(params![agent_id.as_uuid().to_string()], record_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        Ok(out)
    }

    /// Total number of records.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditError::Storage`] on persistence failure.
    pub fn count(&self) -> AuditResult<usize> {
        let out = self.db.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM action_log", [], |r| r.get(0))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })?;
        Ok(out)
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").finish_non_exhaustive()
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<AuditRecord> {
    let status_text: String = row.get(4)?;
    let reason_text: String = row.get(5)?;
    let time_text: String = row.get(6)?;
    Ok(AuditRecord {
        id: AuditRecordId::from_uuid(uuid_col(row, 0)?),
        agent_id: AgentId::from_uuid(uuid_col(row, 1)?),
        tool_id: ToolId::from_uuid(uuid_col(row, 2)?),
        arguments: row.get(3)?,
        status: DecisionStatus::parse(&status_text).ok_or_else(|| {
            corrupt_col(4, format!("invalid decision status: {status_text}"))
        })?,
        reason: ReasonCode::parse(&reason_text)
            .ok_or_else(|| corrupt_col(5, format!("invalid reason code: {reason_text}")))?,
        timestamp: Timestamp::parse_rfc3339(&time_text)
            .ok_or_else(|| corrupt_col(6, format!("invalid timestamp: {time_text}")))?,
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

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> AuditLog {
        AuditLog::new(Arc::new(Db::in_memory().unwrap())).unwrap()
    }

    fn denied_record(agent: AgentId) -> AuditRecord {
        AuditRecord::new(
            agent,
            ToolId::new(),
            "{}",
            DecisionStatus::Denied,
            ReasonCode::BlockedPermission,
        )
    }

    #[test]
    fn test_append_and_list() {
        let log = log();
        let agent = AgentId::new();
        let id = log.append(&denied_record(agent)).unwrap();

        let records = log.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].reason, ReasonCode::BlockedPermission);
    }

    #[test]
    fn test_records_for_agent_filters() {
        let log = log();
        let a = AgentId::new();
        let b = AgentId::new();
        log.append(&denied_record(a)).unwrap();
        log.append(&denied_record(a)).unwrap();
        log.append(&denied_record(b)).unwrap();

        assert_eq!(log.records_for_agent(&a).unwrap().len(), 2);
        assert_eq!(log.records_for_agent(&b).unwrap().len(), 1);
        assert_eq!(log.count().unwrap(), 3);
    }

    #[test]
    fn test_arguments_kept_verbatim() {
        let log = log();
        let record = AuditRecord::new(
            AgentId::new(),
            ToolId::new(),
            "{\"query\":\"SELECT 1\"}",
            DecisionStatus::Executed,
            ReasonCode::Allowed,
        );
        log.append(&record).unwrap();

        let loaded = log.records().unwrap();
        assert_eq!(loaded[0].arguments, "{\"query\":\"SELECT 1\"}");
    }
}
