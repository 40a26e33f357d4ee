//! Security policy: limits and allow/deny lists shared by every request

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Substrings that reject a snippet before it runs, checked in this order.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "import os",
    "import subprocess",
    "import sys",
    "eval(",
    "exec(",
    "__import__",
    "open(",
    "file(",
    "input(",
    "raw_input(",
    "compile(",
    "globals()",
    "locals()",
    "vars(",
    "dir(",
    "getattr(",
    "setattr(",
    "delattr(",
    "hasattr(",
    "exit(",
    "quit(",
    "reload(",
];

/// Modules exposed to snippets unless configured otherwise.
pub const DEFAULT_ALLOWED_MODULES: &[&str] = &[
    "math",
    "random",
    "datetime",
    "json",
    "csv",
    "re",
    "collections",
    "itertools",
    "functools",
    "operator",
    "numpy",
    "pandas",
    "matplotlib.pyplot",
    "requests",
];

/// Process-wide, read-only execution policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    /// Wall-clock budget per snippet, in seconds
    #[serde(default = "default_max_execution_time")]
    pub max_execution_time: u64,
    /// Characters of stdout kept before the truncation marker
    #[serde(default = "default_max_output_length")]
    pub max_output_length: usize,
    /// Characters of stderr a worker will hold in memory
    #[serde(default = "default_max_error_length")]
    pub max_error_length: usize,
    #[serde(default = "default_allowed_modules")]
    pub allowed_modules: BTreeSet<String>,
    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,
    /// Python interpreter used for syntax checks and workers
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
}

fn default_max_execution_time() -> u64 {
    10
}

fn default_max_output_length() -> usize {
    10_000
}

fn default_max_error_length() -> usize {
    1_000_000
}

fn default_allowed_modules() -> BTreeSet<String> {
    DEFAULT_ALLOWED_MODULES.iter().map(|m| m.to_string()).collect()
}

fn default_denylist() -> Vec<String> {
    DEFAULT_DENYLIST.iter().map(|d| d.to_string()).collect()
}

fn default_interpreter() -> String {
    "python3".to_string()
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            max_execution_time: default_max_execution_time(),
            max_output_length: default_max_output_length(),
            max_error_length: default_max_error_length(),
            allowed_modules: default_allowed_modules(),
            denylist: default_denylist(),
            interpreter: default_interpreter(),
        }
    }
}

impl SecurityPolicy {
    /// The execution deadline as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.max_execution_time)
    }

    /// Check if a module is on the allowlist
    pub fn is_module_allowed(&self, module: &str) -> bool {
        self.allowed_modules.contains(module)
    }

    /// First denylist entry found anywhere in `code`, ignoring case.
    ///
    /// Plain substring matching: `print('dir(x)')` is rejected and aliasing
    /// tricks are not caught.
    pub fn first_denied<'a>(&'a self, code: &str) -> Option<&'a str> {
        let haystack = code.to_lowercase();
        self.denylist
            .iter()
            .find(|term| haystack.contains(&term.to_lowercase()))
            .map(String::as_str)
    }
}
