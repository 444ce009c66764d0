//! SLUICE Server
//!
//! Exposes the tool catalog as an MCP JSON-RPC service over HTTP (axum)
//! and stdio. Every `tools/call` goes through the shared dispatcher, so the
//! danger switch and argument rules apply identically on both transports.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod logging;
pub mod rpc;
pub mod stdio;

pub use api::{router, serve_http};
pub use auth::ApiKey;
pub use bootstrap::{build_dispatcher, build_registry};
pub use error::ServerError;
pub use logging::init_tracing;
pub use rpc::McpService;
pub use stdio::run_stdio;
