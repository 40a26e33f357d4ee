//! Code executor: validate, build, run, assemble

use serde::Serialize;
use std::time::Instant;
use tracing::info;

use crate::namespace::{BUILTINS, Builtin, ExecutionNamespace};
use crate::policy::SecurityPolicy;
use crate::result::{ExecutionResult, ResultAssembler};
use crate::runner::Runner;
use crate::validator::{ValidationOutcome, Validator};
use crate::worker::Interpreter;

/// Snapshot of the executor's configuration and interpreter.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutorStats {
    pub max_execution_time: u64,
    pub max_output_length: usize,
    pub allowed_imports: Vec<String>,
    /// Every builtin a snippet can call, with its capability
    pub builtins: &'static [Builtin],
    pub interpreter_version: String,
    pub security_level: &'static str,
}

/// Runs untrusted snippets under a fixed [`SecurityPolicy`].
///
/// All state is read-only after construction, so one executor can be shared
/// behind an `Arc` and called concurrently; every call gets its own worker.
pub struct CodeExecutor {
    policy: SecurityPolicy,
    validator: Validator,
    runner: Runner,
    assembler: ResultAssembler,
}

impl CodeExecutor {
    pub fn new(policy: SecurityPolicy) -> Self {
        Self {
            validator: Validator::new(policy.clone()),
            runner: Runner::new(&policy),
            assembler: ResultAssembler::new(policy.max_output_length, policy.max_execution_time),
            policy,
        }
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    pub async fn validate(&self, code: &str) -> ValidationOutcome {
        self.validator.validate(code).await
    }

    /// Execute `code`. Never fails: every fault is folded into the result.
    pub async fn execute(&self, code: &str) -> ExecutionResult {
        let validation = self.validator.validate(code).await;
        if let Some(rejection) = validation.rejection {
            return self.assembler.rejected(code.to_string(), rejection.into());
        }

        let start = Instant::now();
        let namespace = ExecutionNamespace::build(&self.policy);
        let outcome = self.runner.run(code, namespace).await;
        let result = self
            .assembler
            .assemble(code.to_string(), outcome, start.elapsed());

        info!(
            "Executor: snippet finished (success={}, {:.3}s)",
            result.success, result.execution_time
        );
        result
    }

    pub async fn stats(&self) -> ExecutorStats {
        let interpreter_version = Interpreter::new(self.policy.interpreter.clone())
            .version()
            .await
            .unwrap_or_else(|_| "unavailable".to_string());

        ExecutorStats {
            max_execution_time: self.policy.max_execution_time,
            max_output_length: self.policy.max_output_length,
            allowed_imports: self.policy.allowed_modules.iter().cloned().collect(),
            builtins: BUILTINS,
            interpreter_version,
            security_level: "restricted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::TRUNCATION_MARKER;
    use crate::worker::testing;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn executor_with(adjust: impl FnOnce(&mut SecurityPolicy)) -> Option<CodeExecutor> {
        let mut policy = SecurityPolicy {
            interpreter: testing::python()?,
            max_execution_time: 5,
            allowed_modules: BTreeSet::from(["math".to_string(), "json".to_string()]),
            ..SecurityPolicy::default()
        };
        adjust(&mut policy);
        Some(CodeExecutor::new(policy))
    }

    fn executor() -> Option<CodeExecutor> {
        executor_with(|_| {})
    }

    #[tokio::test]
    async fn test_hello_world() {
        let Some(executor) = executor() else { return };
        let result = executor.execute("print('Hello, World!')").await;
        assert!(result.success, "{}", result.error);
        assert_eq!(result.output, "Hello, World!\n");
        assert_eq!(result.error, "");
        assert_eq!(result.code, "print('Hello, World!')");
        assert!(result.execution_time > 0.0);
    }

    #[tokio::test]
    async fn test_loop_output() {
        let Some(executor) = executor() else { return };
        let result = executor
            .execute("for i in range(3):\n    print(f\"Count: {i}\")\n")
            .await;
        assert!(result.success);
        assert_eq!(result.output, "Count: 0\nCount: 1\nCount: 2\n");
    }

    #[tokio::test]
    async fn test_empty_code_never_runs() {
        let executor = CodeExecutor::new(SecurityPolicy::default());
        let result = executor.execute("   \n").await;
        assert!(!result.success);
        assert_eq!(result.error, "No code provided");
        assert_eq!(result.execution_time, 0.0);
    }

    #[tokio::test]
    async fn test_denylisted_import_rejected() {
        let executor = CodeExecutor::new(SecurityPolicy::default());
        let result = executor.execute("import os; print(os.getcwd())").await;
        assert!(!result.success);
        assert!(result.error.contains("import os"));
        assert_eq!(result.output, "");
        assert_eq!(result.execution_time, 0.0);
    }

    #[tokio::test]
    async fn test_runtime_fault_prefixed() {
        let Some(executor) = executor() else { return };
        let result = executor.execute("x = 1 / 0  # Division by zero").await;
        assert!(!result.success);
        assert!(result.error.starts_with("Runtime Error:"), "{}", result.error);
        assert_eq!(result.output, "");
    }

    #[tokio::test]
    async fn test_output_after_fault_is_dropped() {
        let Some(executor) = executor() else { return };
        let result = executor.execute("print('before')\n[][1]\n").await;
        assert!(!result.success);
        assert_eq!(result.output, "");
        assert!(result.error.starts_with("Runtime Error:"));
    }

    #[tokio::test]
    async fn test_disallowed_import_at_runtime() {
        let Some(executor) = executor() else { return };
        let result = executor.execute("import socket").await;
        assert!(!result.success);
        assert!(result.error.starts_with("Import Error:"));
        assert!(result.error.ends_with("This import is not allowed for security reasons"));
    }

    #[tokio::test]
    async fn test_timeout_within_margin() {
        let Some(executor) = executor_with(|p| p.max_execution_time = 1) else { return };
        let start = std::time::Instant::now();
        let result = executor.execute("while True:\n    pass\n").await;
        assert!(!result.success);
        assert!(result.error.contains("timed out"));
        assert_eq!(result.error, "Code execution timed out after 1 seconds");
        assert_eq!(result.output, "");
        // Syntax check plus one second of running, plus kill and reap.
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_output_truncated_to_limit() {
        let Some(executor) = executor_with(|p| p.max_output_length = 50) else { return };
        let result = executor
            .execute("for i in range(1000):\n    print(i)\n")
            .await;
        assert!(result.success);
        assert!(result.output.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            result.output.chars().count(),
            50 + TRUNCATION_MARKER.chars().count()
        );
    }

    #[tokio::test]
    async fn test_sequential_requests_do_not_share_names() {
        let Some(executor) = executor() else { return };
        let first = executor.execute("leaked = 42\nprint(leaked)").await;
        assert_eq!(first.output, "42\n");

        let second = executor.execute("print(leaked)").await;
        assert!(!second.success);
        assert!(second.error.starts_with("Runtime Error:"));
        assert!(second.error.contains("leaked"));
    }

    #[tokio::test]
    async fn test_concurrent_requests_capture_their_own_output() {
        let Some(executor) = executor() else { return };
        let executor = Arc::new(executor);

        let mut handles = Vec::new();
        for n in 0..6 {
            let executor = Arc::clone(&executor);
            handles.push(tokio::spawn(async move {
                let code = format!("for _ in range(200):\n    print('worker-{n}')\n");
                (n, executor.execute(&code).await)
            }));
        }

        for handle in handles {
            let (n, result) = handle.await.unwrap();
            assert!(result.success, "{}", result.error);
            let expected = format!("worker-{n}\n").repeat(200);
            assert_eq!(result.output, expected);
        }
    }

    #[tokio::test]
    async fn test_stats_reflect_policy() {
        let executor = CodeExecutor::new(SecurityPolicy {
            interpreter: "snipbox-no-such-python".to_string(),
            ..SecurityPolicy::default()
        });
        let stats = executor.stats().await;
        assert_eq!(stats.max_execution_time, 10);
        assert_eq!(stats.max_output_length, 10_000);
        assert_eq!(stats.security_level, "restricted");
        assert_eq!(stats.interpreter_version, "unavailable");
        assert!(stats.allowed_imports.contains(&"math".to_string()));
        let mut sorted = stats.allowed_imports.clone();
        sorted.sort();
        assert_eq!(sorted, stats.allowed_imports);
    }

    #[tokio::test]
    async fn test_stats_list_builtins_by_capability() {
        let executor = CodeExecutor::new(SecurityPolicy {
            interpreter: "snipbox-no-such-python".to_string(),
            ..SecurityPolicy::default()
        });
        let json = serde_json::to_value(executor.stats().await).unwrap();
        let builtins = json["builtins"].as_array().unwrap();
        assert_eq!(builtins.len(), BUILTINS.len());
        assert!(builtins.contains(&serde_json::json!({"name": "print", "capability": "output"})));
        assert!(builtins.contains(&serde_json::json!({"name": "__import__", "capability": "hook"})));
        assert!(!builtins.iter().any(|b| b["name"] == "open"));
    }

    #[tokio::test]
    async fn test_stderr_kept_on_success() {
        let Some(executor) = executor() else { return };
        let result = executor
            .execute("json.codecs.sys.stderr.write('warn\\n')\nprint('ok')")
            .await;
        assert!(result.success, "{}", result.error);
        assert_eq!(result.output, "ok\n");
        assert_eq!(result.error, "warn\n");
    }

    #[tokio::test]
    async fn test_stderr_cut_at_error_limit_without_marker() {
        let Some(executor) = executor_with(|p| p.max_error_length = 3) else { return };
        let result = executor
            .execute("json.codecs.sys.stderr.write('warning\\n')\nprint('ok')")
            .await;
        assert!(result.success, "{}", result.error);
        assert_eq!(result.output, "ok\n");
        assert_eq!(result.error, "war");
        assert!(!result.error.contains(TRUNCATION_MARKER));
    }
}
