//! Transport bindings for the MCP handler.
//!
//! The stdio binding runs a single session for the lifetime of the process's
//! standard streams. The HTTP binding nests the MCP event-stream service in
//! an axum router next to the health routes; each connection gets its own
//! session while the backend facade and catalog are shared.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::routing::get;
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig,
    StreamableHttpService,
    session::local::LocalSessionManager,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::info;

use bq_core::QueryBackend;

use crate::BigQueryMcp;

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "bigquery-mcp-server";

const DEFAULT_MESSAGES_PATH: &str = "/messages";

/// Configuration for the MCP HTTP binding.
#[derive(Debug, Clone)]
pub struct McpHttpConfig {
    pub addr: SocketAddr,
    pub messages_path: String,
    pub stateful_mode: bool,
    pub sse_keep_alive: Option<Duration>,
}

impl McpHttpConfig {
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            messages_path: DEFAULT_MESSAGES_PATH.to_string(),
            stateful_mode: true,
            sse_keep_alive: Some(Duration::from_secs(15)),
        }
    }

    #[must_use]
    pub fn with_messages_path(mut self, messages_path: impl Into<String>) -> Self {
        self.messages_path = messages_path.into();
        self
    }
}

impl Default for McpHttpConfig {
    fn default() -> Self {
        Self::new("0.0.0.0:8080".parse().expect("valid MCP HTTP address"))
    }
}

/// Serves one MCP session over stdio until the streams close.
///
/// # Errors
/// Returns any transport or server error.
pub async fn serve_stdio(
    backend: Arc<dyn QueryBackend>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("serving MCP over stdio");
    let service = BigQueryMcp::new(backend);
    let (stdin, stdout) = stdio();
    let running = serve_server(service, (stdin, stdout)).await?;
    let _ = running.waiting().await?;
    Ok(())
}

/// Builds the HTTP surface: health routes plus the MCP event-stream service.
#[must_use]
pub fn http_router(
    backend: Arc<dyn QueryBackend>,
    config: &McpHttpConfig,
    cancellation: &CancellationToken,
) -> Router {
    let service: StreamableHttpService<BigQueryMcp, LocalSessionManager> =
        StreamableHttpService::new(
            move || Ok(BigQueryMcp::new(backend.clone())),
            Arc::new(LocalSessionManager::default()),
            StreamableHttpServerConfig {
                stateful_mode: config.stateful_mode,
                sse_keep_alive: config.sse_keep_alive,
                cancellation_token: cancellation.child_token(),
                ..Default::default()
            },
        );

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .nest_service(&config.messages_path, service)
}

/// Serves the MCP server over HTTP until ctrl-c.
///
/// Shutdown stops accepting new connections first, then cancels the sessions
/// still streaming.
///
/// # Errors
/// Returns any listener or server error.
pub async fn serve_http(
    backend: Arc<dyn QueryBackend>,
    config: McpHttpConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cancellation = CancellationToken::new();
    let app = http_router(backend, &config, &cancellation);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, path = %config.messages_path, "serving MCP over HTTP");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
            cancellation.cancel();
        })
        .await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": SERVICE_NAME}))
}
