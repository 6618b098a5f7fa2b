//! Running git against a local clone
//!
//! The rebase orchestrator only needs "run these arguments in this
//! directory and give me the exit code and output". Keeping that behind a
//! trait lets tests script git's answers without touching a real clone.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one git invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GitOutput {
    /// Exit code, `None` if git was killed by a signal
    pub code: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl GitOutput {
    /// Output of a command that exited 0
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Output of a command that exited with `code`
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether git exited 0
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Text worth showing the user when the command failed
    ///
    /// Prefers stderr, falling back to stdout (git prints some rebase
    /// conflicts there).
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Executes git commands in a working directory
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run `git <args>` with `dir` as the working directory
    ///
    /// A non-zero exit is not an error here; it is reported through
    /// [`GitOutput::code`]. Errors mean git could not be run at all or
    /// did not finish in time.
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<GitOutput>;
}

/// Runs the `git` binary found on `PATH`
#[derive(Debug, Clone)]
pub struct SystemGit {
    timeout: Duration,
}

impl SystemGit {
    /// Create a runner that kills any invocation exceeding `timeout`
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl GitRunner for SystemGit {
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<GitOutput> {
        debug!(dir = %dir.display(), ?args, "git");

        let child = Command::new("git")
            .args(args)
            .current_dir(dir)
            // never block on a credential prompt
            .env("GIT_TERMINAL_PROMPT", "0")
            // untranslated messages
            .env("LC_ALL", "C")
            .env_remove("LANGUAGE")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| Error::Timeout {
                operation: format!("git {}", args.join(" ")),
                timeout: self.timeout,
            })??;

        let output = GitOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(code = ?output.code, "git finished");
        Ok(output)
    }
}
