//! Decision records for gate outcomes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sluice_core::{DangerClass, ToolError};

/// Gate verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Forwarded to the collaborator
    Allow,
    /// Refused before the collaborator
    Deny,
}

/// One gate decision, emitted through `tracing`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    /// Unique decision ID
    pub id: String,
    /// Operation name
    pub operation: String,
    /// Danger class of the operation
    pub danger: DangerClass,
    /// Verdict
    pub verdict: Verdict,
    /// Error kind and message for denials
    pub reason: Option<String>,
    /// Arguments with sensitive values redacted
    pub args: Map<String, Value>,
    /// When the decision was made
    pub timestamp: DateTime<Utc>,
}

impl Decision {
    /// Create an allow decision
    #[must_use]
    pub fn allow(operation: &str, danger: DangerClass) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            operation: operation.to_string(),
            danger,
            verdict: Verdict::Allow,
            reason: None,
            args: Map::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a deny decision from the error that caused it
    #[must_use]
    pub fn deny(operation: &str, danger: DangerClass, err: &ToolError) -> Self {
        Self {
            verdict: Verdict::Deny,
            reason: Some(format!("{}: {}", err.kind(), err)),
            ..Self::allow(operation, danger)
        }
    }

    /// Attach the (already redacted) arguments
    #[must_use]
    pub fn with_args(mut self, args: Map<String, Value>) -> Self {
        self.args = args;
        self
    }

    /// Whether the call went through
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.verdict == Verdict::Allow
    }

    /// Emit the record
    pub fn emit(&self) {
        let args = Value::Object(self.args.clone()).to_string();
        match self.verdict {
            Verdict::Allow => tracing::info!(
                decision_id = %self.id,
                operation = %self.operation,
                danger = %self.danger,
                args = %args,
                "gate allowed"
            ),
            Verdict::Deny => tracing::warn!(
                decision_id = %self.id,
                operation = %self.operation,
                danger = %self.danger,
                reason = self.reason.as_deref().unwrap_or(""),
                args = %args,
                "gate denied"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_decision() {
        let d = Decision::allow("fs_read_file", DangerClass::Safe);
        assert!(d.is_allowed());
        assert!(d.reason.is_none());
        assert_eq!(d.id.len(), 36);
    }

    #[test]
    fn test_deny_decision_carries_reason() {
        let err = ToolError::authorization("pg_drop_table");
        let d = Decision::deny("pg_drop_table", DangerClass::Dangerous, &err);
        assert!(!d.is_allowed());
        assert!(d.reason.as_deref().unwrap().starts_with("authorization:"));
    }

    #[test]
    fn test_decision_ids_unique() {
        let a = Decision::allow("x", DangerClass::Safe);
        let b = Decision::allow("x", DangerClass::Safe);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_decision_serializes() {
        let d = Decision::allow("x", DangerClass::Dangerous);
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["verdict"], serde_json::json!("allow"));
        assert_eq!(v["danger"], serde_json::json!("dangerous"));
    }
}
