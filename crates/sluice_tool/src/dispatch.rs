//! Dispatcher: gate, delegate, normalize.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sluice_core::{Response, ToolError};
use sluice_policy::Gate;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use crate::args::Args;
use crate::normalize::{normalize, panic_error};
use crate::registry::ToolRegistry;
use crate::schema::ToolDescription;

/// One call: operation name plus raw arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Operation name
    pub operation: String,
    /// Arguments as a JSON object (null for none)
    #[serde(default)]
    pub arguments: Value,
}

impl InvocationRequest {
    /// Create a request
    #[must_use]
    pub fn new(operation: impl Into<String>, arguments: Value) -> Self {
        Self {
            operation: operation.into(),
            arguments,
        }
    }
}

/// Routes requests through the gate to the owning tool family
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    gate: Gate,
}

impl Dispatcher {
    /// Create a dispatcher over an immutable registry
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, gate: Gate) -> Self {
        Self { registry, gate }
    }

    /// Registry backing this dispatcher
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Gate used for every call
    #[must_use]
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Catalog in registration order
    #[must_use]
    pub fn describe(&self) -> Vec<ToolDescription> {
        self.registry.specs().map(ToolDescription::from_spec).collect()
    }

    /// Run one invocation. Never fails; errors come back as responses.
    pub async fn invoke(&self, request: InvocationRequest) -> Response {
        let started = Instant::now();
        let Some(entry) = self.registry.get(&request.operation) else {
            let err = ToolError::not_found("operation", request.operation.as_str());
            tracing::warn!(operation = %request.operation, "unknown operation");
            return Response::error(&err);
        };
        let spec = entry.spec;

        let args = match self.gate.admit(spec, &request.arguments).await {
            Ok(args) => Args::new(args),
            Err(err) => return normalize(spec.name, Err(err), started.elapsed()),
        };

        let call = AssertUnwindSafe(entry.handler.invoke(spec.name, args)).catch_unwind();
        let result = match call.await {
            Ok(result) => result,
            Err(panic) => Err(panic_error(spec.name, panic.as_ref())),
        };
        normalize(spec.name, result, started.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SpyToolSet;
    use serde_json::json;
    use sluice_core::{ErrorKind, FixedSwitch, Outcome};
    use sluice_policy::{OperationSpec, ParamSpec, Rule};

    static OPS: &[OperationSpec] = &[
        OperationSpec {
            params: &[ParamSpec::int("limit").default_int(10)],
            rules: &[Rule::ClampLimit {
                param: "limit",
                max: 50,
            }],
            ..OperationSpec::safe("spy", "spy_read", "Read something")
        },
        OperationSpec {
            params: &[
                ParamSpec::ident("table").required(),
                ParamSpec::string("where_clause"),
            ],
            rules: &[Rule::NonEmptyFilter("where_clause")],
            ..OperationSpec::dangerous("spy", "spy_delete", "Delete something")
        },
    ];

    fn setup(allowed: bool) -> (Dispatcher, Arc<SpyToolSet>) {
        let spy = Arc::new(SpyToolSet::new("spy", OPS));
        let mut registry = ToolRegistry::new();
        registry.register(spy.clone()).unwrap();
        let gate = Gate::new(Arc::new(FixedSwitch::new(allowed)), std::env::temp_dir());
        (Dispatcher::new(Arc::new(registry), gate), spy)
    }

    #[tokio::test]
    async fn test_safe_call_reaches_handler() {
        let (dispatcher, spy) = setup(false);
        let resp = dispatcher
            .invoke(InvocationRequest::new("spy_read", json!({"limit": 500})))
            .await;
        assert_eq!(resp.outcome, Outcome::Ok);
        assert_eq!(spy.call_count(), 1);
        let (op, args) = &spy.calls()[0];
        assert_eq!(op, "spy_read");
        assert_eq!(args.int("limit").unwrap(), 50);
    }

    #[tokio::test]
    async fn test_dangerous_call_blocked() {
        let (dispatcher, spy) = setup(false);
        let resp = dispatcher
            .invoke(InvocationRequest::new(
                "spy_delete",
                json!({"table": "users", "where_clause": "id = 1"}),
            ))
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Authorization.as_str()));
        assert_eq!(spy.call_count(), 0);
    }

    #[tokio::test]
    async fn test_validation_blocks_handler() {
        let (dispatcher, spy) = setup(true);
        let resp = dispatcher
            .invoke(InvocationRequest::new(
                "spy_delete",
                json!({"table": "users", "where_clause": ""}),
            ))
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
        assert_eq!(spy.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let (dispatcher, _) = setup(true);
        let resp = dispatcher
            .invoke(InvocationRequest::new("nope", Value::Null))
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::NotFound.as_str()));
    }

    #[tokio::test]
    async fn test_handler_error_normalized() {
        let spy = Arc::new(
            SpyToolSet::new("spy", OPS).failing(ToolError::conflict("database is busy")),
        );
        let mut registry = ToolRegistry::new();
        registry.register(spy.clone()).unwrap();
        let gate = Gate::new(Arc::new(FixedSwitch::new(true)), std::env::temp_dir());
        let dispatcher = Dispatcher::new(Arc::new(registry), gate);

        let resp = dispatcher
            .invoke(InvocationRequest::new("spy_read", json!({})))
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Conflict.as_str()));
        assert!(resp.payload["message"]
            .as_str()
            .unwrap()
            .contains("database is busy"));
    }

    #[tokio::test]
    async fn test_describe_lists_catalog() {
        let (dispatcher, _) = setup(false);
        let names: Vec<_> = dispatcher.describe().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["spy_read", "spy_delete"]);
    }
}
