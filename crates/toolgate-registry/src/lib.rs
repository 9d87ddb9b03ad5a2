//! Toolgate Registry - the administrative data model behind the policy engine.
//!
//! This crate owns the entities an administrator manages (agent
//! profiles, servers, tools) and the permission store the policy engine
//! reads. Two cross-cutting invariants live here:
//!
//! - **Default deny with explicit rows.** Creating an agent backfills an
//!   `allowed=false` permission row for every existing tool; creating or
//!   syncing a tool backfills one for every existing agent. An absent
//!   row still denies - the backfill exists so administrators see the
//!   full grant matrix, not so the engine can rely on it.
//! - **One row per (agent, tool).** Grants are upserts against a unique
//!   key, so granting twice is a no-op and concurrent grant/creation
//!   races cannot produce duplicates.
//!
//! The policy engine reads through the transaction-scoped helpers
//! ([`Registry::tool_tx`], [`Registry::permission_tx`]) so its lookups
//! and its paired write share one transaction.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod discovery;
/// Registry error types.
pub mod error;
pub mod registry;
pub mod types;

pub use discovery::{DiscoveredTool, StaticDiscovery, SyncReport, ToolDiscovery};
pub use error::{RegistryError, RegistryResult};
pub use registry::Registry;
pub use types::{
    AgentProfile, NewAgent, NewServer, NewTool, Server, ServerKind, Tool, ToolPermission,
};
