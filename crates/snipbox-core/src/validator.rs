//! Validator: reject snippets before anything runs
//!
//! Three checks, in order: empty input, the substring denylist, and a syntax
//! check that compiles the code in a throwaway interpreter without running it.

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::error::ExecError;
use crate::policy::SecurityPolicy;
use crate::worker::{Interpreter, Invocation, SYNTAX_FAULT_EXIT, SYNTAX_CHECK, tail};

/// Why a snippet was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    Denylisted(String),
    Syntax(String),
    /// The syntax check could not give an answer
    Unchecked(String),
}

impl From<Rejection> for ExecError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Empty => ExecError::InvalidInput,
            Rejection::Denylisted(term) => ExecError::DenylistViolation(term),
            Rejection::Syntax(msg) => ExecError::InvalidSyntax(msg),
            Rejection::Unchecked(msg) => ExecError::Unchecked(msg),
        }
    }
}

/// Result of [`Validator::validate`]; `error` is empty when `valid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub rejection: Option<Rejection>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self { rejection: None }
    }

    pub fn rejected(rejection: Rejection) -> Self {
        Self {
            rejection: Some(rejection),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.rejection.is_none()
    }

    pub fn error(&self) -> String {
        self.rejection
            .clone()
            .map(|r| ExecError::from(r).to_string())
            .unwrap_or_default()
    }
}

impl Serialize for ValidationOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire {
            valid: bool,
            error: String,
        }
        Wire {
            valid: self.is_valid(),
            error: self.error(),
        }
        .serialize(serializer)
    }
}

pub struct Validator {
    policy: SecurityPolicy,
    interpreter: Interpreter,
}

impl Validator {
    pub fn new(policy: SecurityPolicy) -> Self {
        let interpreter = Interpreter::new(policy.interpreter.clone());
        Self {
            policy,
            interpreter,
        }
    }

    pub async fn validate(&self, code: &str) -> ValidationOutcome {
        if code.trim().is_empty() {
            return ValidationOutcome::rejected(Rejection::Empty);
        }

        if let Some(term) = self.policy.first_denied(code) {
            warn!("Validator: rejected snippet containing '{}'", term);
            return ValidationOutcome::rejected(Rejection::Denylisted(term.to_string()));
        }

        match self.check_syntax(code).await {
            Ok(()) => ValidationOutcome::valid(),
            Err(rejection) => {
                debug!("Validator: {:?}", rejection);
                ValidationOutcome::rejected(rejection)
            }
        }
    }

    async fn check_syntax(&self, code: &str) -> Result<(), Rejection> {
        let invocation = self
            .interpreter
            .invoke(SYNTAX_CHECK, code.as_bytes().to_vec(), self.policy.timeout())
            .await
            .map_err(|e| Rejection::Unchecked(e.to_string()))?;

        match invocation {
            Invocation::Exited { status, .. } if status.success() => Ok(()),
            Invocation::Exited { status, stdout, .. }
                if status.code() == Some(SYNTAX_FAULT_EXIT) =>
            {
                Err(Rejection::Syntax(String::from_utf8_lossy(&stdout).into_owned()))
            }
            Invocation::Exited { status, stderr, .. } => Err(Rejection::Unchecked(format!(
                "syntax check failed ({}): {}",
                status,
                tail(&stderr, 500)
            ))),
            Invocation::TimedOut => Err(Rejection::Unchecked(format!(
                "syntax check exceeded {} seconds",
                self.policy.max_execution_time
            ))),
        }
    }
}
