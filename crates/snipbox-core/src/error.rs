//! Error types for the execution engine
//!
//! Every fault that can happen while handling a snippet ends up as an
//! [`ExecError`]. Its `Display` output is the exact, category-prefixed text
//! placed in the `error` field of an [`ExecutionResult`](crate::ExecutionResult).

use thiserror::Error;

/// A classified failure of a single execution request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("No code provided")]
    InvalidInput,
    #[error("Potentially dangerous operation detected: {0}")]
    DenylistViolation(String),
    /// Rejected by the pre-execution syntax check.
    #[error("Syntax error: {0}")]
    InvalidSyntax(String),
    /// The syntax check itself could not run.
    #[error("Syntax check unavailable: {0}")]
    Unchecked(String),
    /// Raised by the interpreter while compiling or running the snippet.
    #[error("Syntax Error: {0}")]
    Syntax(String),
    #[error("Import Error: {0} - This import is not allowed for security reasons")]
    Import(String),
    #[error("Code execution timed out after {0} seconds")]
    Timeout(u64),
    #[error("Runtime Error: {0}")]
    Runtime(String),
}

/// Infrastructure faults while driving a worker process.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("failed to start interpreter '{interpreter}': {source}")]
    Spawn {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },
    #[error("worker i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode worker payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("worker exited ({status}) without a report: {stderr}")]
    NoReport { status: String, stderr: String },
    #[error("worker sent an unreadable report: {0}")]
    BadReport(String),
    #[error("interpreter did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

impl From<WorkerError> for ExecError {
    fn from(err: WorkerError) -> Self {
        ExecError::Runtime(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_category_prefix() {
        assert_eq!(ExecError::InvalidInput.to_string(), "No code provided");
        assert_eq!(
            ExecError::DenylistViolation("import os".into()).to_string(),
            "Potentially dangerous operation detected: import os"
        );
        assert_eq!(
            ExecError::Runtime("division by zero".into()).to_string(),
            "Runtime Error: division by zero"
        );
        assert_eq!(
            ExecError::Import("import of 'socket' is not allowed".into()).to_string(),
            "Import Error: import of 'socket' is not allowed - This import is not allowed for security reasons"
        );
        assert!(ExecError::Syntax("bad".into()).to_string().starts_with("Syntax Error: "));
    }

    #[test]
    fn test_timeout_message_names_limit() {
        assert_eq!(
            ExecError::Timeout(10).to_string(),
            "Code execution timed out after 10 seconds"
        );
    }

    #[test]
    fn test_worker_error_becomes_runtime_error() {
        let err = WorkerError::BadReport("eof".into());
        let exec: ExecError = err.into();
        assert!(matches!(exec, ExecError::Runtime(_)));
        assert!(exec.to_string().starts_with("Runtime Error: "));
    }

    #[test]
    fn test_worker_timeout_names_wait() {
        let err = WorkerError::Timeout(std::time::Duration::from_secs(5));
        assert_eq!(err.to_string(), "interpreter did not answer within 5s");
    }
}
