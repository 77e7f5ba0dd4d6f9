//! Command executor
//!
//! Spawns the CLI under test, captures both streams and reports the exit
//! status. A non-zero exit is a result, never an error: the caller decides
//! whether it matters.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;

use crate::common::{Error, Result};

/// A command line to run plus the description used in log lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Human-readable step description
    pub description: String,
    /// Program path followed by its arguments
    pub argv: Vec<String>,
}

impl Invocation {
    pub fn new(description: impl Into<String>, argv: Vec<String>) -> Self {
        Self {
            description: description.into(),
            argv,
        }
    }

    /// The program to spawn (first element of argv)
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    /// Arguments passed to the program
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    /// Copy of this invocation with extra arguments appended
    pub fn with_args<I, S>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = self.argv.clone();
        argv.extend(extra.into_iter().map(Into::into));
        Self {
            description: self.description.clone(),
            argv,
        }
    }

    /// Whether `arg` appears anywhere in the argument list
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args().iter().any(|a| a == arg)
    }
}

/// Exit status and captured output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    /// Exit code, -1 when the process was killed by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Execution {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Text worth showing for a failed command: stderr, falling back to stdout
    pub fn failure_output(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

/// Runs invocations to completion
///
/// Implementations must not return an error for a non-zero exit; only a
/// command that could not be run at all is an error.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, invocation: &Invocation) -> Result<Execution>;
}

/// Executor backed by real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(&self, invocation: &Invocation) -> Result<Execution> {
        let output = TokioCommand::new(invocation.program())
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| Error::Spawn {
                program: invocation.program().to_string(),
                source,
            })?;

        Ok(Execution {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run an invocation and log its outcome
///
/// Captured stdout is echoed on success, stderr (or stdout when stderr is
/// empty) on failure.
pub async fn run_command(executor: &dyn Executor, invocation: &Invocation) -> Result<Execution> {
    tracing::info!("{}", invocation.description);
    tracing::debug!(argv = ?invocation.argv, "spawning");

    let execution = executor.execute(invocation).await?;

    if execution.success() {
        tracing::info!("Command succeeded: {}", invocation.description);
        let stdout = execution.stdout.trim();
        if !stdout.is_empty() {
            println!("STDOUT:");
            println!("{stdout}");
        }
    } else {
        tracing::warn!(
            "Command failed: {} (exit code {})",
            invocation.description,
            execution.code
        );
        if !execution.stderr.trim().is_empty() {
            println!("STDERR:");
            println!("{}", execution.stderr.trim());
        } else if !execution.stdout.trim().is_empty() {
            println!("STDOUT (unexpected):");
            println!("{}", execution.stdout.trim());
        }
    }

    Ok(execution)
}
