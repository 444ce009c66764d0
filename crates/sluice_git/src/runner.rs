//! Git subprocess runner.

use async_trait::async_trait;
use sluice_core::{GitSettings, ToolError, ToolResult};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Captured result of one git invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GitOutput {
    /// Exit status; -1 when killed by a signal
    pub status: i32,
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

impl GitOutput {
    /// Successful output carrying `stdout`
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output carrying `stderr`
    #[must_use]
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether git exited with status 0
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Text git printed, stdout and stderr joined
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, _) => self.stderr.trim_end().to_string(),
        }
    }
}

/// Runs git in a working directory.
///
/// Only spawn failures and timeouts are errors here; a non-zero exit comes
/// back as a [`GitOutput`] for the caller to classify.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run `git <args>` with `repo` as the working directory
    async fn run(&self, repo: &Path, args: &[String]) -> ToolResult<GitOutput>;
}

/// Runs the real git executable as a child process
#[derive(Debug, Clone)]
pub struct ProcessGitRunner {
    bin: String,
    timeout: Duration,
}

impl ProcessGitRunner {
    /// Runner for `bin`, killing children that outlive `timeout`
    #[must_use]
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    /// Runner built from configuration
    #[must_use]
    pub fn from_settings(settings: &GitSettings) -> Self {
        Self::new(settings.bin.clone(), settings.timeout)
    }
}

#[async_trait]
impl GitRunner for ProcessGitRunner {
    async fn run(&self, repo: &Path, args: &[String]) -> ToolResult<GitOutput> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(args)
            .current_dir(repo)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(repo = %repo.display(), ?args, "running git");
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                ToolError::upstream(
                    "git",
                    format!("git {} timed out after {}s", first(args), self.timeout.as_secs()),
                )
            })?
            .map_err(|e| ToolError::upstream("git", format!("failed to run {}: {}", self.bin, e)))?;

        Ok(GitOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn first(args: &[String]) -> &str {
    args.first().map(String::as_str).unwrap_or("")
}

/// Classify a failed git invocation
#[must_use]
pub fn git_error(output: &GitOutput) -> ToolError {
    let message = output.combined();
    if message.contains("not a git repository") {
        ToolError::not_found("repository", message)
    } else if message.contains("CONFLICT")
        || message.contains("Automatic merge failed")
        || message.contains("nothing to commit")
    {
        ToolError::conflict(message)
    } else {
        ToolError::upstream("git", message)
    }
}
