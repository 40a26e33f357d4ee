//! Execution engine for short, untrusted Python snippets
//!
//! A request flows through four stages:
//! validation (empty input, substring denylist, syntax check), namespace
//! construction from a static builtin table plus the module allowlist, a
//! time-bounded run in a dedicated interpreter process, and assembly of the
//! captured output into an [`ExecutionResult`]. Every failure is folded into
//! the result; nothing escapes to the caller.
//!
//! The denylist is plain substring matching and the namespace is a Python-level
//! restriction. Neither is a strong isolation boundary.

pub mod error;
pub mod executor;
pub mod namespace;
pub mod policy;
pub mod result;
pub mod runner;
pub mod validator;
mod worker;

// Re-export main types
pub use error::{ExecError, WorkerError};
pub use executor::{CodeExecutor, ExecutorStats};
pub use namespace::{BUILTINS, Builtin, Capability, ExecutionNamespace, ModuleBinding};
pub use policy::SecurityPolicy;
pub use result::{ExecutionResult, ResultAssembler, TRUNCATION_MARKER};
pub use runner::{RunOutcome, Runner};
pub use validator::{Rejection, ValidationOutcome, Validator};
