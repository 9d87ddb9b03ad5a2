//! Toolgate Exec - the execution boundary.
//!
//! The policy core never talks to downstream servers itself; it
//! authorizes, and a [`ToolExecutor`] carries the call. This crate
//! defines that contract plus the pieces a real executor needs:
//!
//! - [`ToolExecutor`] / [`ExecutionOutcome`] - the invoke contract
//! - [`Transport`] / [`ToolConnection`] - per-protocol connection logic
//! - [`ConnectionPool`] - connections keyed by server id with an
//!   injected idle-timeout policy and an explicit staleness sweep
//! - [`SecretsProvider`] / [`SecretValue`] - opaque credential lookup,
//!   consumed only here (the policy core never sees secret values)
//!
//! [`MockExecutor`] echoes requests and stands in for a live protocol
//! client in tests and development setups.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Execution error types.
pub mod error;
pub mod executor;
pub mod pool;
pub mod secrets;
pub mod transport;

pub use error::{ExecError, ExecResult};
pub use executor::{ExecutionOutcome, MockExecutor, ToolExecutor};
pub use pool::{ConnectionPool, PoolConfig};
pub use secrets::{MemorySecrets, NoSecrets, SecretValue, SecretsProvider};
pub use transport::{PooledExecutor, ToolConnection, Transport};
