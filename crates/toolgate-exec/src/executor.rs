//! Executor contract and the mock implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolgate_core::ServerId;

use crate::error::ExecResult;

/// What a carried tool call produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ExecutionOutcome {
    /// The tool ran and returned a result.
    Success {
        /// The tool's result payload.
        result: Value,
    },
    /// The tool ran (or was dispatched) and reported failure.
    Failure {
        /// The reported error.
        error: String,
    },
}

impl ExecutionOutcome {
    /// A success carrying `result`.
    #[must_use]
    pub fn success(result: Value) -> Self {
        Self::Success { result }
    }

    /// A failure carrying `error`.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    /// Whether the call succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// The execution capability the gateway consumes.
///
/// Invoked only after the policy engine grants immediate allowance or a
/// pending approval resolves to approved. Implementations own protocol,
/// process, and credential handling; the policy core sees none of it.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Carry one tool call to the server that owns it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ExecError`] for infrastructure failures; a tool
    /// that runs and fails reports through
    /// [`ExecutionOutcome::Failure`].
    async fn invoke(
        &self,
        server_id: &ServerId,
        tool_name: &str,
        arguments_json: &str,
    ) -> ExecResult<ExecutionOutcome>;
}

/// How the mock responds.
#[derive(Debug, Clone)]
enum MockMode {
    Echo,
    Fail(String),
}

/// Development and test stand-in for a live protocol client.
///
/// Echoes the request back as the result, or fails with a fixed error
/// when built with [`MockExecutor::failing`].
#[derive(Debug, Clone)]
pub struct MockExecutor {
    mode: MockMode,
}

impl MockExecutor {
    /// An executor that echoes every call.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: MockMode::Echo,
        }
    }

    /// An executor whose every call reports `error`.
    #[must_use]
    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            mode: MockMode::Fail(error.into()),
        }
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for MockExecutor {
    async fn invoke(
        &self,
        server_id: &ServerId,
        tool_name: &str,
        arguments_json: &str,
    ) -> ExecResult<ExecutionOutcome> {
        match &self.mode {
            MockMode::Fail(error) => Ok(ExecutionOutcome::failure(error.clone())),
            MockMode::Echo => {
                let arguments: Value = match serde_json::from_str(arguments_json) {
                    Ok(value) => value,
                    Err(e) => {
                        return Ok(ExecutionOutcome::failure(format!(
                            "invalid argument payload: {e}"
                        )));
                    }
                };
                tracing::debug!(server = %server_id, tool = tool_name, "mock execution");
                Ok(ExecutionOutcome::success(serde_json::json!({
                    "mock": true,
                    "server": server_id.to_string(),
                    "tool": tool_name,
                    "echo": arguments,
                })))
            }
        }
    }
}
