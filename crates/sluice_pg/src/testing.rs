//! Recording executor for tests.

use async_trait::async_trait;
use serde_json::Value;
use sluice_core::{ToolError, ToolResult};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::executor::{Row, SqlExecutor, SqlParam};

/// Which executor entry point a call used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// [`SqlExecutor::fetch_rows`]
    Rows,
    /// [`SqlExecutor::fetch_value`]
    Value,
    /// [`SqlExecutor::fetch_rows_read_only`]
    ReadOnlyRows,
    /// [`SqlExecutor::fetch_value_read_only`]
    ReadOnlyValue,
    /// [`SqlExecutor::execute`]
    Execute,
    /// [`SqlExecutor::execute_script`]
    Script,
}

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Entry point used
    pub kind: CallKind,
    /// Statement text
    pub sql: String,
    /// Bound parameters
    pub params: Vec<SqlParam>,
}

/// Canned answer for the next call
#[derive(Debug, Clone)]
pub enum Canned {
    /// Rows for `fetch_rows`
    Rows(Vec<Row>),
    /// Value for `fetch_value`
    Value(Value),
    /// Rows affected for `execute` / `execute_script`
    Affected(u64),
    /// Failure for any call
    Error(ToolError),
}

/// Records every statement; answers with queued results, then empty ones
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<RecordedCall>>,
    queued: Mutex<VecDeque<Canned>>,
}

impl RecordingExecutor {
    /// Executor answering every call with an empty result
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer
    #[must_use]
    pub fn with(self, answer: Canned) -> Self {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(answer);
        }
        self
    }

    /// Queue rows built from JSON objects
    #[must_use]
    pub fn with_rows(self, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.with(Canned::Rows(rows))
    }

    /// Calls so far
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Statement text of the last call
    #[must_use]
    pub fn last_sql(&self) -> Option<String> {
        self.calls
            .lock()
            .ok()
            .and_then(|c| c.last().map(|call| call.sql.clone()))
    }

    fn record(&self, kind: CallKind, sql: &str, params: &[SqlParam]) -> Option<Canned> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                kind,
                sql: sql.to_string(),
                params: params.to_vec(),
            });
        }
        self.queued.lock().ok().and_then(|mut q| q.pop_front())
    }

    fn rows(&self, kind: CallKind, sql: &str, params: &[SqlParam]) -> ToolResult<Vec<Row>> {
        match self.record(kind, sql, params) {
            None => Ok(Vec::new()),
            Some(Canned::Rows(rows)) => Ok(rows),
            Some(Canned::Error(err)) => Err(err),
            Some(other) => Err(mismatch("rows", &other)),
        }
    }

    fn value(&self, kind: CallKind, sql: &str, params: &[SqlParam]) -> ToolResult<Value> {
        match self.record(kind, sql, params) {
            None => Ok(Value::Null),
            Some(Canned::Value(value)) => Ok(value),
            Some(Canned::Error(err)) => Err(err),
            Some(other) => Err(mismatch("value", &other)),
        }
    }
}

fn mismatch(expected: &str, got: &Canned) -> ToolError {
    ToolError::upstream(
        "postgres",
        format!("test executor expected {} answer, queued {:?}", expected, got),
    )
}

#[async_trait]
impl SqlExecutor for RecordingExecutor {
    async fn fetch_rows(&self, sql: &str, params: &[SqlParam]) -> ToolResult<Vec<Row>> {
        self.rows(CallKind::Rows, sql, params)
    }

    async fn fetch_value(&self, sql: &str, params: &[SqlParam]) -> ToolResult<Value> {
        self.value(CallKind::Value, sql, params)
    }

    async fn fetch_rows_read_only(&self, sql: &str, params: &[SqlParam]) -> ToolResult<Vec<Row>> {
        self.rows(CallKind::ReadOnlyRows, sql, params)
    }

    async fn fetch_value_read_only(&self, sql: &str, params: &[SqlParam]) -> ToolResult<Value> {
        self.value(CallKind::ReadOnlyValue, sql, params)
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> ToolResult<u64> {
        match self.record(CallKind::Execute, sql, params) {
            None => Ok(0),
            Some(Canned::Affected(n)) => Ok(n),
            Some(Canned::Error(err)) => Err(err),
            Some(other) => Err(mismatch("affected", &other)),
        }
    }

    async fn execute_script(&self, sql: &str) -> ToolResult<u64> {
        match self.record(CallKind::Script, sql, &[]) {
            None => Ok(0),
            Some(Canned::Affected(n)) => Ok(n),
            Some(Canned::Error(err)) => Err(err),
            Some(other) => Err(mismatch("affected", &other)),
        }
    }
}
