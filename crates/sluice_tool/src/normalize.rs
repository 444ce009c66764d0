//! Response normalization.
//!
//! Every handler result, success or failure, leaves the dispatcher as a
//! [`Response`]. Collaborator messages are carried through verbatim.

use sluice_core::{confirmation, Payload, Response, ToolError, ToolResult};
use std::time::Duration;

/// Convert a handler result into a response and log the outcome
#[must_use]
pub fn normalize(operation: &str, result: ToolResult<Payload>, elapsed: Duration) -> Response {
    let elapsed_ms = elapsed.as_millis() as u64;
    match result {
        Ok(Payload::Null) => {
            tracing::info!(operation, elapsed_ms, "operation completed");
            Response::ok(confirmation(operation))
        }
        Ok(payload) => {
            tracing::info!(operation, elapsed_ms, "operation completed");
            Response::ok(payload)
        }
        Err(err) => {
            tracing::warn!(
                operation,
                elapsed_ms,
                kind = %err.kind(),
                error = %err,
                "operation failed"
            );
            Response::error(&err)
        }
    }
}

/// Error reported when a handler panics
#[must_use]
pub fn panic_error(operation: &str, panic: &(dyn std::any::Any + Send)) -> ToolError {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string());
    ToolError::upstream("internal", format!("{} aborted: {}", operation, detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sluice_core::{ErrorKind, Outcome};

    #[test]
    fn test_success_passthrough() {
        let resp = normalize("fs_stat", Ok(json!({"size": 3})), Duration::ZERO);
        assert_eq!(resp.outcome, Outcome::Ok);
        assert_eq!(resp.payload, json!({"size": 3}));
    }

    #[test]
    fn test_null_becomes_confirmation() {
        let resp = normalize("clear_notes", Ok(Payload::Null), Duration::ZERO);
        assert_eq!(resp.payload, json!("OK: clear_notes"));
    }

    #[test]
    fn test_error_preserves_message() {
        let err = ToolError::upstream("postgres", "relation \"nope\" does not exist");
        let resp = normalize("pg_query", Err(err), Duration::ZERO);
        assert_eq!(resp.outcome, Outcome::Error);
        assert_eq!(resp.error_kind(), Some(ErrorKind::Upstream.as_str()));
        assert!(resp.payload["message"]
            .as_str()
            .unwrap()
            .contains("relation \"nope\" does not exist"));
    }

    #[test]
    fn test_panic_error_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        let err = panic_error("fs_tree", payload.as_ref());
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(err.to_string().contains("boom"));
    }
}
