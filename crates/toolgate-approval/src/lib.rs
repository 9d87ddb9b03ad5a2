//! Toolgate Approval - the policy engine and the approval lifecycle.
//!
//! This is the decision core of the gateway. [`PolicyEngine::evaluate`]
//! classifies an execution request against the tool's risk tier and the
//! agent's permission:
//!
//! | risk tier        | permission | outcome                                |
//! |------------------|------------|----------------------------------------|
//! | `blocked`        | any        | deny, `blocked_risk`                   |
//! | any              | absent/false | deny, `blocked_permission`           |
//! | `safe`           | true       | allow, `allowed`                       |
//! | `needs_approval` | true       | defer, `needs_approval` (queued)       |
//! | unrecognized     | true       | deny, `blocked_risk` (flagged)         |
//!
//! Rules apply top-down, first match wins: risk blocking is the
//! administrative kill-switch no grant can bypass, and permission is
//! checked before tier-driven allow/defer so a non-permitted agent
//! cannot learn how a tool is classified.
//!
//! Every successful `evaluate` produces exactly one side effect - an
//! audit record for terminal decisions, a [`PendingAction`] for
//! deferred ones - inside the same transaction as the reads, so a
//! persistence failure leaves nothing behind.
//!
//! [`ApprovalResolver`] drives `pending -> approved | denied`, exactly
//! once per action: the transition is a conditional update that only
//! succeeds while the row is still `pending`, and the terminal audit
//! record commits with it. Resolution authorizes; invoking the tool
//! afterwards is the caller's job.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod action;
pub mod engine;
/// Policy error types.
pub mod error;
pub mod resolver;
pub mod result;
pub mod store;

pub use action::{PendingAction, PendingStatus};
pub use engine::PolicyEngine;
pub use error::{ApprovalResult, PolicyError};
pub use resolver::{ApprovalResolver, BatchFailure, BatchOutcome, Resolution};
pub use result::PolicyResult;
pub use store::PendingStore;
