//! Interpreter processes: one short-lived child per invocation
//!
//! Each invocation starts a fresh Python interpreter in isolated mode with a
//! cleared environment, feeds it a payload on stdin, and collects its pipes.
//! If the deadline passes first the child is killed and reaped before the
//! caller hears about the timeout.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::WorkerError;

/// Builds the restricted namespace, runs the snippet, prints one JSON report.
pub(crate) const BOOTSTRAP: &str = include_str!("bootstrap.py");

/// Compiles stdin without running it; exits with [`SYNTAX_FAULT_EXIT`] on failure.
pub(crate) const SYNTAX_CHECK: &str = include_str!("syntax_check.py");

pub(crate) const SYNTAX_FAULT_EXIT: i32 = 3;

/// How a child process ended.
#[derive(Debug)]
pub(crate) enum Invocation {
    Exited {
        status: ExitStatus,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    /// Killed at the deadline; its output was discarded.
    TimedOut,
}

/// Launcher for a Python interpreter.
#[derive(Debug, Clone)]
pub(crate) struct Interpreter {
    program: String,
    workdir: PathBuf,
}

impl Interpreter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            workdir: std::env::temp_dir(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .env_clear()
            .current_dir(&self.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(path) = std::env::var_os("PATH") {
            command.env("PATH", path);
        }
        command
    }

    /// Run `script` with `input` on stdin, waiting at most `limit`.
    pub async fn invoke(
        &self,
        script: &str,
        input: Vec<u8>,
        limit: Duration,
    ) -> Result<Invocation, WorkerError> {
        let mut child = self
            .command()
            .args(["-I", "-B", "-c", script])
            .spawn()
            .map_err(|source| WorkerError::Spawn {
                interpreter: self.program.clone(),
                source,
            })?;

        let feeder = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                // A child that dies early closes the pipe; its exit status tells the story.
                if let Err(e) = stdin.write_all(&input).await {
                    debug!("Worker stdin closed early: {}", e);
                }
                drop(stdin);
            })
        });
        let stdout = tokio::spawn(drain(child.stdout.take()));
        let stderr = tokio::spawn(drain(child.stderr.take()));

        match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => {
                let status = status?;
                let stdout = collect(stdout).await?;
                let stderr = collect(stderr).await?;
                if let Some(feeder) = feeder {
                    let _ = feeder.await;
                }
                Ok(Invocation::Exited {
                    status,
                    stdout,
                    stderr,
                })
            }
            Err(_) => {
                warn!(
                    "Worker exceeded {:?}, killing pid {:?}",
                    limit,
                    child.id()
                );
                if let Err(e) = child.start_kill() {
                    warn!("Failed to kill worker: {}", e);
                }
                let _ = child.wait().await;
                stdout.abort();
                stderr.abort();
                if let Some(feeder) = feeder {
                    feeder.abort();
                }
                Ok(Invocation::TimedOut)
            }
        }
    }

    /// `Python 3.x.y`, as reported by the interpreter.
    pub async fn version(&self) -> Result<String, WorkerError> {
        let wait = Duration::from_secs(5);
        let output = tokio::time::timeout(
            wait,
            self.command().arg("--version").stdin(Stdio::null()).output(),
        )
        .await
        .map_err(|_| WorkerError::Timeout(wait))?
        .map_err(|source| WorkerError::Spawn {
            interpreter: self.program.clone(),
            source,
        })?;

        // Python 2 printed its version on stderr.
        let text = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&text).trim().to_string())
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

async fn collect(task: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>, WorkerError> {
    let bytes = task.await.map_err(std::io::Error::other)??;
    Ok(bytes)
}

/// Shorten interpreter diagnostics for error messages.
pub(crate) fn tail(bytes: &[u8], max_chars: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}
