//! Uniform response shape returned for every invocation.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ToolError;

/// Structured payload carried by a response
pub type Payload = serde_json::Value;

/// Whether the invocation succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The collaborator accepted the operation
    Ok,
    /// The gate or the collaborator refused the operation
    Error,
}

/// Result of one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Success or failure
    pub outcome: Outcome,
    /// Data or `{"error": kind, "message": text}`
    pub payload: Payload,
}

impl Response {
    /// Successful response
    #[must_use]
    pub fn ok(payload: Payload) -> Self {
        Self {
            outcome: Outcome::Ok,
            payload,
        }
    }

    /// Successful response carrying an `"OK: ..."` confirmation string
    #[must_use]
    pub fn confirmed(message: impl std::fmt::Display) -> Self {
        Self::ok(confirmation(message))
    }

    /// Failed response
    #[must_use]
    pub fn error(err: &ToolError) -> Self {
        Self {
            outcome: Outcome::Error,
            payload: json!({
                "error": err.kind().as_str(),
                "message": err.to_string(),
            }),
        }
    }

    /// Whether this response reports a failure
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.outcome == Outcome::Error
    }

    /// Error kind of a failed response
    #[must_use]
    pub fn error_kind(&self) -> Option<&str> {
        if self.is_error() {
            self.payload.get("error").and_then(|v| v.as_str())
        } else {
            None
        }
    }

    /// Text rendering of the payload: strings verbatim, JSON otherwise
    #[must_use]
    pub fn text(&self) -> String {
        match &self.payload {
            Payload::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}

impl From<ToolError> for Response {
    fn from(err: ToolError) -> Self {
        Self::error(&err)
    }
}

/// Confirmation payload `"OK: <message>"`
#[must_use]
pub fn confirmation(message: impl std::fmt::Display) -> Payload {
    Payload::String(format!("OK: {}", message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_ok_response() {
        let resp = Response::ok(json!({"rows": []}));
        assert_eq!(resp.outcome, Outcome::Ok);
        assert!(!resp.is_error());
        assert!(resp.error_kind().is_none());
    }

    #[test]
    fn test_confirmed_response() {
        let resp = Response::confirmed("Table public.users created");
        assert_eq!(resp.payload, json!("OK: Table public.users created"));
        assert_eq!(resp.text(), "OK: Table public.users created");
    }

    #[test]
    fn test_error_response_shape() {
        let resp = Response::from(ToolError::authorization("pg_drop_table"));
        assert!(resp.is_error());
        assert_eq!(resp.error_kind(), Some(ErrorKind::Authorization.as_str()));
        assert_eq!(
            resp.payload["message"],
            json!("pg_drop_table requires ENABLE_DANGEROUS=true in environment")
        );
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let resp = Response::ok(json!(1));
        let text = serde_json::to_string(&resp).unwrap();
        assert!(text.contains("\"outcome\":\"ok\""));
    }
}
