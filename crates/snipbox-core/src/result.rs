//! Result assembler: turn a run (or a rejection) into an `ExecutionResult`

use serde::Serialize;
use std::time::Duration;

use crate::error::ExecError;
use crate::runner::RunOutcome;

/// Appended to stdout when it is cut at the configured length.
pub const TRUNCATION_MARKER: &str = "\n... (output truncated)";

/// Final answer for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: String,
    /// Seconds
    pub execution_time: f64,
    pub code: String,
}

/// Keep the first `max_chars` characters and mark the cut.
pub fn truncate_output(output: String, max_chars: usize) -> String {
    let Some((cut, _)) = output.char_indices().nth(max_chars) else {
        return output;
    };
    let mut kept = output;
    kept.truncate(cut);
    kept.push_str(TRUNCATION_MARKER);
    kept
}

pub struct ResultAssembler {
    max_output_length: usize,
    max_execution_time: u64,
}

impl ResultAssembler {
    pub fn new(max_output_length: usize, max_execution_time: u64) -> Self {
        Self {
            max_output_length,
            max_execution_time,
        }
    }

    /// A snippet that never ran.
    pub fn rejected(&self, code: String, error: ExecError) -> ExecutionResult {
        ExecutionResult {
            success: false,
            output: String::new(),
            error: error.to_string(),
            execution_time: 0.0,
            code,
        }
    }

    pub fn assemble(&self, code: String, outcome: RunOutcome, elapsed: Duration) -> ExecutionResult {
        let execution_time = elapsed.as_secs_f64();
        match outcome {
            RunOutcome::Completed { stdout, stderr } => ExecutionResult {
                success: true,
                output: truncate_output(stdout, self.max_output_length),
                error: stderr,
                execution_time,
                code,
            },
            RunOutcome::TimedOut => self.failed(
                code,
                ExecError::Timeout(self.max_execution_time),
                execution_time,
            ),
            RunOutcome::Failed(err) => self.failed(code, err, execution_time),
        }
    }

    fn failed(&self, code: String, err: ExecError, execution_time: f64) -> ExecutionResult {
        ExecutionResult {
            success: false,
            output: String::new(),
            error: err.to_string(),
            execution_time,
            code,
        }
    }
}
