//! Recording git runner for tests.

use async_trait::async_trait;
use sluice_core::ToolResult;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::runner::{GitOutput, GitRunner};

/// Records every invocation; answers with queued outputs, then empty success
#[derive(Debug, Default)]
pub struct RecordingGitRunner {
    calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
    queued: Mutex<VecDeque<GitOutput>>,
}

impl RecordingGitRunner {
    /// Runner answering every call with empty success
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `output` as the answer to the next unanswered call
    #[must_use]
    pub fn with_output(self, output: GitOutput) -> Self {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(output);
        }
        self
    }

    /// Argument lists received so far
    #[must_use]
    pub fn calls(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of invocations so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl GitRunner for RecordingGitRunner {
    async fn run(&self, repo: &Path, args: &[String]) -> ToolResult<GitOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((repo.to_path_buf(), args.to_vec()));
        }
        let next = self.queued.lock().ok().and_then(|mut q| q.pop_front());
        Ok(next.unwrap_or_default())
    }
}
