//! Shared database handle.

use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::Mutex;

use crate::error::{StorageError, StorageResult};

/// Busy timeout applied to every connection.
const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Shared handle to the embedded database.
///
/// Cheap to clone behind an `Arc`; all access is serialized through an
/// internal lock. Domain stores run their DDL at construction and their
/// statements through [`Db::with_conn`] or [`Db::transaction`].
pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the file cannot be opened
    /// or the pragmas fail to apply.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database (for tests).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the connection fails.
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Apply connection pragmas.
    fn configure(conn: &Connection) -> StorageResult<()> {
        conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))?;
        // WAL is a no-op for in-memory databases; harmless to request.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(())
    }

    /// Run `f` with the connection.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if the lock is poisoned,
    /// otherwise whatever `f` returns.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        f(&conn)
    }

    /// Run `f` inside a transaction, committing on `Ok`.
    ///
    /// On `Err` the transaction rolls back and no statement issued by
    /// `f` is visible - this is the unit of atomicity the policy engine
    /// relies on (read plus paired write, or nothing).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if the lock is poisoned,
    /// [`StorageError::Database`] if begin/commit fails, otherwise
    /// whatever `f` returns.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").finish_non_exhaustive()
    }
}
