//! Toolgate Storage - embedded persistence layer.
//!
//! All durable state (agents, servers, tools, permissions, pending
//! actions, the audit log) lives in a single `SQLite` database file
//! behind a shared [`Db`] handle. Domain crates own their tables and
//! create them at construction; this crate owns the connection, the
//! pragmas, and the transaction discipline.
//!
//! The handle serializes access through an internal lock, which is what
//! gives the policy engine its per-call atomicity: a read of the risk
//! tier and permission state plus the paired audit or pending-action
//! write happen inside one [`Db::transaction`] call and commit as a unit.
//!
//! [`Db::in_memory`] backs every test without touching the filesystem.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod db;
pub mod error;

pub use db::Db;
pub use error::{StorageError, StorageResult};

/// Re-export for domain crates that write SQL against the shared handle.
pub use rusqlite;
