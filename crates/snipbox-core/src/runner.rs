//! Execution runner: run a validated snippet in its own worker process

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ExecError, WorkerError};
use crate::namespace::{ExecutionNamespace, ModuleBinding};
use crate::policy::SecurityPolicy;
use crate::worker::{BOOTSTRAP, Interpreter, Invocation, tail};

/// What came back from a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { stdout: String, stderr: String },
    Failed(ExecError),
    /// The worker was killed at the deadline; no output is kept.
    TimedOut,
}

#[derive(Serialize)]
struct WorkerPayload<'a> {
    code: &'a str,
    builtins: &'a [&'static str],
    modules: &'a [ModuleBinding],
    max_output_length: usize,
    max_error_length: usize,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum ReportStatus {
    Completed,
    SyntaxError,
    ImportError,
    RuntimeError,
}

#[derive(Debug, Deserialize)]
struct WorkerReport {
    status: ReportStatus,
    #[serde(default)]
    message: String,
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    omitted_modules: Vec<String>,
}

impl WorkerReport {
    /// The report is the last non-empty line the worker printed.
    fn parse(stdout: &[u8]) -> Result<Option<Self>, WorkerError> {
        let text = String::from_utf8_lossy(stdout);
        match text.lines().rev().find(|line| !line.trim().is_empty()) {
            Some(line) => serde_json::from_str(line)
                .map(Some)
                .map_err(|e| WorkerError::BadReport(e.to_string())),
            None => Ok(None),
        }
    }

    fn into_outcome(self) -> RunOutcome {
        match self.status {
            ReportStatus::Completed => RunOutcome::Completed {
                stdout: self.stdout,
                stderr: self.stderr,
            },
            ReportStatus::SyntaxError => RunOutcome::Failed(ExecError::Syntax(self.message)),
            ReportStatus::ImportError => RunOutcome::Failed(ExecError::Import(self.message)),
            ReportStatus::RuntimeError => RunOutcome::Failed(ExecError::Runtime(self.message)),
        }
    }
}

pub struct Runner {
    interpreter: Interpreter,
    limit: Duration,
    max_output_length: usize,
    max_error_length: usize,
}

impl Runner {
    pub fn new(policy: &SecurityPolicy) -> Self {
        Self {
            interpreter: Interpreter::new(policy.interpreter.clone()),
            limit: policy.timeout(),
            max_output_length: policy.max_output_length,
            max_error_length: policy.max_error_length,
        }
    }

    /// Run `code` against `namespace`, waiting no longer than the policy allows.
    pub async fn run(&self, code: &str, namespace: ExecutionNamespace) -> RunOutcome {
        let run_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        debug!(
            run_id = %run_id,
            "Runner: starting {} ({} bytes, {} modules)",
            self.interpreter.program(),
            code.len(),
            namespace.modules.len()
        );

        match self.drive(code, &namespace, &run_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(run_id = %run_id, "Runner: worker failed: {}", e);
                RunOutcome::Failed(e.into())
            }
        }
    }

    async fn drive(
        &self,
        code: &str,
        namespace: &ExecutionNamespace,
        run_id: &str,
    ) -> Result<RunOutcome, WorkerError> {
        let payload = serde_json::to_vec(&WorkerPayload {
            code,
            builtins: &namespace.builtins,
            modules: &namespace.modules,
            max_output_length: self.max_output_length,
            max_error_length: self.max_error_length,
        })?;

        let (status, stdout, stderr) =
            match self.interpreter.invoke(BOOTSTRAP, payload, self.limit).await? {
                Invocation::TimedOut => {
                    warn!(run_id = %run_id, "Runner: timed out after {:?}", self.limit);
                    return Ok(RunOutcome::TimedOut);
                }
                Invocation::Exited {
                    status,
                    stdout,
                    stderr,
                } => (status, stdout, stderr),
            };

        let report = WorkerReport::parse(&stdout)?.ok_or_else(|| WorkerError::NoReport {
            status: status.to_string(),
            stderr: tail(&stderr, 500),
        })?;

        if !report.omitted_modules.is_empty() {
            debug!(
                run_id = %run_id,
                "Runner: modules unavailable in interpreter: {}",
                report.omitted_modules.join(", ")
            );
        }
        info!(run_id = %run_id, "Runner: worker finished with {:?}", report.status);
        Ok(report.into_outcome())
    }
}
