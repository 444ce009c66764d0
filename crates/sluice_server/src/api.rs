//! HTTP transport: `POST /mcp` and `GET /health`.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::ApiKey;
use crate::error::ServerError;
use crate::rpc::McpService;

#[derive(Clone)]
struct AppState {
    service: Arc<McpService>,
    api_key: Option<Arc<ApiKey>>,
}

/// Build the router. With `api_key` set, `/mcp` requires a bearer key;
/// `/health` stays open.
pub fn router(service: Arc<McpService>, api_key: Option<ApiKey>) -> Router {
    let state = AppState {
        service,
        api_key: api_key.map(Arc::new),
    };
    let mcp_routes = Router::new()
        .route("/mcp", post(mcp))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .merge(mcp_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let dispatcher = state.service.dispatcher();
    Json(json!({
        "status": "ok",
        "tools": dispatcher.registry().len(),
        "families": dispatcher.registry().families(),
        "dangerous_enabled": dispatcher.gate().dangerous_allowed(),
    }))
}

async fn mcp(State(state): State<AppState>, body: String) -> Response {
    match state.service.handle_text(&body).await {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = &state.api_key else {
        return next.run(request).await;
    };
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if expected.accepts_header(presented) {
        next.run(request).await
    } else {
        tracing::warn!("rejected /mcp request with missing or invalid API key");
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            Json(json!({
                "error": "unauthorized",
                "message": "Missing or invalid API key. Send Authorization: Bearer <MCP_API_KEY>",
            })),
        )
            .into_response()
    }
}

/// Bind `addr` and serve until Ctrl-C
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve_http(addr: SocketAddr, app: Router) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    tracing::info!(addr = %addr, "serving MCP over HTTP");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
