//! MCP JSON-RPC 2.0 method handling, shared by every transport.

use serde::Deserialize;
use serde_json::{json, Value};
use sluice_tool::{Dispatcher, InvocationRequest};
use std::sync::Arc;

/// Protocol revision announced by `initialize` when the client names none
pub const MCP_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "sluice";

/// Invalid JSON
pub const PARSE_ERROR: i64 = -32700;
/// Not a JSON-RPC request object
pub const INVALID_REQUEST: i64 = -32600;
/// Unknown method
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Malformed `params`
pub const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(default, rename = "jsonrpc")]
    _jsonrpc: Option<String>,
    method: String,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    params: Option<Value>,
}

/// Successful JSON-RPC reply
#[must_use]
pub fn json_rpc_response(id: Option<Value>, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

/// JSON-RPC error reply
#[must_use]
pub fn json_rpc_error(id: Option<Value>, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

/// Stateless MCP service over a dispatcher
#[derive(Debug, Clone)]
pub struct McpService {
    dispatcher: Arc<Dispatcher>,
}

impl McpService {
    /// Serve the catalog of `dispatcher`
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Dispatcher behind this service
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle one raw message. `None` means no reply is due (notifications).
    pub async fn handle_text(&self, raw: &str) -> Option<Value> {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => Some(json_rpc_error(None, PARSE_ERROR, &format!("Parse error: {e}"))),
        }
    }

    /// Handle one parsed message
    pub async fn handle_value(&self, value: Value) -> Option<Value> {
        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => Some(json_rpc_error(
                id,
                INVALID_REQUEST,
                &format!("Invalid request: {e}"),
            )),
        }
    }

    async fn handle(&self, request: JsonRpcRequest) -> Option<Value> {
        let id = request.id;
        match request.method.as_str() {
            "initialize" => {
                let version = request
                    .params
                    .as_ref()
                    .and_then(|p| p.get("protocolVersion"))
                    .and_then(Value::as_str)
                    .unwrap_or(MCP_VERSION)
                    .to_string();
                Some(json_rpc_response(
                    id,
                    json!({
                        "protocolVersion": version,
                        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
                        "capabilities": { "tools": { "listChanged": false } },
                    }),
                ))
            }
            "ping" => Some(json_rpc_response(id, json!({}))),
            "tools/list" => Some(json_rpc_response(
                id,
                json!({ "tools": self.dispatcher.describe() }),
            )),
            "tools/call" => Some(self.call_tool(id, request.params).await),
            method if method.starts_with("notifications/") || method == "initialized" => None,
            method => {
                tracing::debug!(method, "unknown JSON-RPC method");
                Some(json_rpc_error(
                    id,
                    METHOD_NOT_FOUND,
                    &format!("Method not found: {method}"),
                ))
            }
        }
    }

    async fn call_tool(&self, id: Option<Value>, params: Option<Value>) -> Value {
        let Some(Value::Object(params)) = params else {
            return json_rpc_error(id, INVALID_PARAMS, "params must be an object");
        };
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return json_rpc_error(id, INVALID_PARAMS, "params.name must be a string");
        };
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(args @ Value::Object(_)) => args.clone(),
            Some(_) => {
                return json_rpc_error(id, INVALID_PARAMS, "params.arguments must be an object");
            }
        };

        let response = self
            .dispatcher
            .invoke(InvocationRequest::new(name, arguments))
            .await;
        let mut result = json!({
            "content": [{ "type": "text", "text": response.text() }],
            "isError": response.is_error(),
        });
        if response.payload.is_object() {
            result["structuredContent"] = response.payload;
        }
        json_rpc_response(id, result)
    }
}
