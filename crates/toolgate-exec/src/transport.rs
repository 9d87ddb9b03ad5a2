//! Transport abstraction and the pooled executor.
//!
//! A [`Transport`] knows how to dial one kind of server (an MCP stdio
//! subprocess, an HTTP API) and hand back a [`ToolConnection`] that can
//! carry calls. [`PooledExecutor`] composes a transport with a
//! [`ConnectionPool`] and secret injection to implement
//! [`ToolExecutor`]; the wire protocol itself lives entirely in the
//! transport implementation, outside this workspace's scope.

use async_trait::async_trait;
use std::sync::Arc;

use toolgate_core::ServerId;

use crate::error::ExecResult;
use crate::executor::{ExecutionOutcome, ToolExecutor};
use crate::pool::{ConnectionPool, PoolConfig};
use crate::secrets::SecretsProvider;

/// A live connection to one server.
#[async_trait]
pub trait ToolConnection: Send + Sync + 'static {
    /// Carry one tool call over this connection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ExecError::Invoke`] when the connection breaks
    /// mid-call.
    async fn call(&self, tool_name: &str, arguments_json: &str) -> ExecResult<ExecutionOutcome>;
}

/// Dialing logic for one kind of server.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// The connection type this transport produces.
    type Conn: ToolConnection;

    /// Establish a connection to `server_id`, pulling whatever
    /// credentials it needs from `secrets`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ExecError::Connect`] when the server cannot be
    /// reached.
    async fn connect(
        &self,
        server_id: &ServerId,
        secrets: &dyn SecretsProvider,
    ) -> ExecResult<Self::Conn>;
}

/// [`ToolExecutor`] over a [`Transport`] with pooled connections.
pub struct PooledExecutor<T: Transport> {
    transport: T,
    pool: ConnectionPool<T::Conn>,
    secrets: Arc<dyn SecretsProvider>,
}

impl<T: Transport> PooledExecutor<T> {
    /// Build the executor.
    #[must_use]
    pub fn new(transport: T, config: PoolConfig, secrets: Arc<dyn SecretsProvider>) -> Self {
        Self {
            transport,
            pool: ConnectionPool::new(config),
            secrets,
        }
    }

    /// The pool, for lifecycle control (sweeping, explicit disconnect).
    #[must_use]
    pub fn pool(&self) -> &ConnectionPool<T::Conn> {
        &self.pool
    }
}

#[async_trait]
impl<T: Transport> ToolExecutor for PooledExecutor<T> {
    async fn invoke(
        &self,
        server_id: &ServerId,
        tool_name: &str,
        arguments_json: &str,
    ) -> ExecResult<ExecutionOutcome> {
        let conn = self
            .pool
            .get_or_connect(server_id, || {
                self.transport.connect(server_id, self.secrets.as_ref())
            })
            .await?;
        conn.call(tool_name, arguments_json).await
    }
}

impl<T: Transport> std::fmt::Debug for PooledExecutor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledExecutor")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecError;
    use crate::secrets::{MemorySecrets, SecretValue};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that records dials and requires a token secret.
    struct CountingTransport {
        dials: Arc<AtomicUsize>,
    }

    struct CountingConn {
        token: String,
    }

    #[async_trait]
    impl ToolConnection for CountingConn {
        async fn call(
            &self,
            tool_name: &str,
            _arguments_json: &str,
        ) -> ExecResult<ExecutionOutcome> {
            Ok(ExecutionOutcome::success(serde_json::json!({
                "tool": tool_name,
                "authed": !self.token.is_empty(),
            })))
        }
    }

    #[async_trait]
    impl Transport for CountingTransport {
        type Conn = CountingConn;

        async fn connect(
            &self,
            server_id: &ServerId,
            secrets: &dyn SecretsProvider,
        ) -> ExecResult<Self::Conn> {
            self.dials.fetch_add(1, Ordering::SeqCst);
            let token = secrets
                .get("API_TOKEN")
                .as_ref()
                .map(SecretValue::expose)
                .map(str::to_string)
                .ok_or_else(|| ExecError::Connect {
                    server: *server_id,
                    message: "missing API_TOKEN".to_string(),
                })?;
            Ok(CountingConn { token })
        }
    }

    #[tokio::test]
    async fn test_pooled_executor_reuses_connections() {
        let dials = Arc::new(AtomicUsize::new(0));
        let secrets = MemorySecrets::new();
        secrets.insert("API_TOKEN", "t0ken");
        let executor = PooledExecutor::new(
            CountingTransport {
                dials: Arc::clone(&dials),
            },
            PoolConfig::default(),
            Arc::new(secrets),
        );
        let server = ServerId::new();

        for _ in 0..3 {
            let outcome = executor.invoke(&server, "ping", "{}").await.unwrap();
            assert!(outcome.is_success());
        }
        assert_eq!(dials.load(Ordering::SeqCst), 1);
        assert_eq!(executor.pool().len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_secret_fails_connect() {
        let executor = PooledExecutor::new(
            CountingTransport {
                dials: Arc::new(AtomicUsize::new(0)),
            },
            PoolConfig::default(),
            Arc::new(crate::secrets::NoSecrets),
        );

        let err = executor
            .invoke(&ServerId::new(), "ping", "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Connect { .. }));
    }
}
