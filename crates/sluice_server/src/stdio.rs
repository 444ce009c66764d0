//! Newline-delimited JSON-RPC over stdin/stdout.

use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::rpc::McpService;

/// Serve requests from `reader` until end of input, one JSON message per line
///
/// # Errors
///
/// Returns an error if reading or writing fails.
pub async fn serve_lines<R, W>(service: &McpService, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let raw = line.trim();
        if raw.is_empty() {
            continue;
        }
        if let Some(reply) = service.handle_text(raw).await {
            let mut out = serde_json::to_vec(&reply)?;
            out.push(b'\n');
            writer.write_all(&out).await?;
            writer.flush().await?;
        }
    }
    Ok(())
}

/// Serve the process's stdin and stdout
///
/// # Errors
///
/// Returns an error if stdin or stdout fails.
pub async fn run_stdio(service: Arc<McpService>) -> std::io::Result<()> {
    tracing::info!("serving MCP over stdio");
    serve_lines(&service, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}
