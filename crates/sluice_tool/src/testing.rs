//! Spy tool family for exercising the dispatcher without a collaborator.

use async_trait::async_trait;
use serde_json::json;
use sluice_core::{Payload, ToolError, ToolResult};
use sluice_policy::OperationSpec;
use std::sync::Mutex;

use crate::args::Args;
use crate::trait_::ToolSet;

/// Records every call it receives and answers with a canned result
pub struct SpyToolSet {
    family: &'static str,
    operations: &'static [OperationSpec],
    calls: Mutex<Vec<(String, Args)>>,
    failure: Option<ToolError>,
}

impl SpyToolSet {
    /// Spy answering `{"operation": name}` for every call
    #[must_use]
    pub fn new(family: &'static str, operations: &'static [OperationSpec]) -> Self {
        Self {
            family,
            operations,
            calls: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    /// Answer every call with `err` instead
    #[must_use]
    pub fn failing(mut self, err: ToolError) -> Self {
        self.failure = Some(err);
        self
    }

    /// Calls received so far
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Args)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls received so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ToolSet for SpyToolSet {
    fn family(&self) -> &'static str {
        self.family
    }

    fn operations(&self) -> &'static [OperationSpec] {
        self.operations
    }

    async fn invoke(&self, operation: &str, args: Args) -> ToolResult<Payload> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((operation.to_string(), args));
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(json!({ "operation": operation })),
        }
    }
}
