//! Redaction of sensitive argument values before logging.

use serde_json::{Map, Value};
use std::collections::HashSet;

/// Replacement for redacted values
pub const REDACTED: &str = "***REDACTED***";

/// Name fragments that mark an argument as sensitive
const SENSITIVE_FRAGMENTS: &[&str] = &["password", "secret", "token", "key"];

/// Redactor for argument maps
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    /// Extra names to always redact
    sensitive_fields: HashSet<String>,
}

impl Redactor {
    /// Create a redactor with the built-in name fragments only
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field name that is always redacted
    #[must_use]
    pub fn with_sensitive_field(mut self, field: impl Into<String>) -> Self {
        self.sensitive_fields.insert(field.into());
        self
    }

    /// Check if a field is sensitive
    #[must_use]
    pub fn is_sensitive(&self, field_name: &str) -> bool {
        if self.sensitive_fields.contains(field_name) {
            return true;
        }
        let lowered = field_name.to_ascii_lowercase();
        SENSITIVE_FRAGMENTS.iter().any(|f| lowered.contains(f))
    }

    /// Copy of `args` with sensitive values replaced
    #[must_use]
    pub fn redact_args(&self, args: &Map<String, Value>) -> Map<String, Value> {
        args.iter()
            .map(|(name, value)| {
                let value = if self.is_sensitive(name) {
                    Value::from(REDACTED)
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_sensitive() {
        let redactor = Redactor::new();
        assert!(redactor.is_sensitive("password"));
        assert!(redactor.is_sensitive("api_secret"));
        assert!(redactor.is_sensitive("auth_token"));
        assert!(redactor.is_sensitive("MCP_API_KEY"));
        assert!(!redactor.is_sensitive("username"));
    }

    #[test]
    fn test_custom_field() {
        let redactor = Redactor::new().with_sensitive_field("content");
        assert!(redactor.is_sensitive("content"));
    }

    #[test]
    fn test_redact_args() {
        let args = json!({"username": "app", "password": "hunter2"});
        let redacted = Redactor::new().redact_args(args.as_object().unwrap());
        assert_eq!(redacted["username"], json!("app"));
        assert_eq!(redacted["password"], json!(REDACTED));
    }
}
