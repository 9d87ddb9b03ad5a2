//! Toolgate Audit - append-only log of terminal policy decisions.
//!
//! Every decision that reaches a terminal state - executed or denied,
//! whether at evaluation time or when a pending approval resolves -
//! lands here exactly once, with the reason code that produced it.
//!
//! The log is immutable by construction: this crate exposes append and
//! read operations only. There is no update, no delete, and nothing in
//! the rest of the workspace writes to the `action_log` table directly.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Audit error types.
pub mod error;
pub mod log;
pub mod record;

pub use error::{AuditError, AuditResult};
pub use log::AuditLog;
pub use record::AuditRecord;
