//! stdio and streamable-HTTP transports for [`PolicyMcpServer`].

use std::sync::Arc;

use rmcp::ServiceExt;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::server::PolicyMcpServer;

/// Path the HTTP transport is mounted on.
const MCP_PATH: &str = "/mcp";

/// Serves one client over stdin/stdout until it disconnects.
///
/// Stdout belongs to the protocol, so nothing else may print there.
///
/// # Errors
///
/// Fails when the handshake or the session fails.
pub async fn serve_stdio(server: PolicyMcpServer) -> anyhow::Result<()> {
    info!("MCP server on stdio");
    server.serve(stdio()).await?.waiting().await?;
    Ok(())
}

/// Serves MCP's streamable HTTP transport on `host:port` until Ctrl-C.
///
/// The subcommand keeps the `sse` name. Every session gets its own clone of
/// `server`; the clones share one knowledge base and orchestrator.
///
/// # Errors
///
/// Fails when the address cannot be bound or the server stops abnormally.
pub async fn serve_sse(server: PolicyMcpServer, host: &str, port: u16) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let config = StreamableHttpServerConfig {
        cancellation_token: shutdown.child_token(),
        ..Default::default()
    };
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        config,
    );

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, path = MCP_PATH, "MCP server listening");

    let app = axum::Router::new().nest_service(MCP_PATH, service);
    axum::serve(listener, app)
        .with_graceful_shutdown(cancel_on_ctrl_c(shutdown))
        .await?;
    Ok(())
}

async fn cancel_on_ctrl_c(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
    }
    token.cancel();
}
