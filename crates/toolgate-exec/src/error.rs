use toolgate_core::ServerId;

/// Errors from the execution boundary.
///
/// These are infrastructure failures (cannot reach the server, transport
/// broke mid-call). A tool that runs and reports its own failure comes
/// back as [`crate::ExecutionOutcome::Failure`], not as an error here.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Could not establish a connection to the server.
    #[error("failed to connect to {server}: {message}")]
    Connect {
        /// The server that was being contacted.
        server: ServerId,
        /// What went wrong.
        message: String,
    },

    /// The connection broke while carrying the call.
    #[error("invocation failed: {0}")]
    Invoke(String),
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
