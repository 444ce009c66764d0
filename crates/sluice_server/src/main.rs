//! SLUICE Server
//!
//! Gated MCP tool server for notes, filesystem, git and PostgreSQL.

#![warn(missing_docs)]
#![warn(clippy::all)]

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sluice_core::{EnvSwitch, Settings};
use sluice_server::{build_dispatcher, init_tracing, router, run_stdio, serve_http, ApiKey, McpService};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Transport {
    /// `POST /mcp` on MCP_BIND
    Http,
    /// Newline-delimited JSON on stdin/stdout
    Stdio,
}

#[derive(Parser)]
#[command(name = "sluice-server")]
#[command(about = "Gated MCP tool server", long_about = None, version)]
struct Args {
    /// Transport to serve
    #[arg(long, value_enum, default_value_t = Transport::Http)]
    transport: Transport,

    /// Bind address, overriding MCP_BIND
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Fail at startup instead of disabling the pg tools when PG* variables are missing
    #[arg(long)]
    require_postgres: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::from_env().context("invalid configuration")?;
    init_tracing(settings.server.log_format);

    let dispatcher = build_dispatcher(&settings, Arc::new(EnvSwitch::new()), args.require_postgres)?;
    let service = Arc::new(McpService::new(Arc::new(dispatcher)));

    match args.transport {
        Transport::Stdio => run_stdio(service).await?,
        Transport::Http => {
            let addr = args.bind.unwrap_or(settings.server.bind);
            let api_key = settings.server.api_key.as_ref().map(ApiKey::new);
            if api_key.is_none() {
                tracing::warn!("API key authentication disabled; /mcp is open");
            }
            serve_http(addr, router(service, api_key)).await?;
        }
    }

    Ok(())
}
