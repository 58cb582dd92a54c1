//! Daemon entry point for the BigQuery MCP gateway.
//!
//! Loads configuration from flags and the environment, constructs the
//! BigQuery backend, and serves the MCP protocol over the selected
//! transport. Logs go to stderr so the stdio transport keeps stdout clean.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use bq_core::QueryBackend;
use bq_gcp::BigQueryBackend;
use bq_mcp::server::{McpHttpConfig, serve_http, serve_stdio};

use crate::config::{McpdConfig, TransportKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = McpdConfig::from_args()?;
    let backend: Arc<dyn QueryBackend> = Arc::new(BigQueryBackend::new(config.bigquery)?);

    match config.transport {
        TransportKind::Stdio => serve_stdio(backend).await?,
        TransportKind::Http => {
            let http = McpHttpConfig::new(config.http_addr)
                .with_messages_path(config.messages_path);
            serve_http(backend, http).await?;
        }
    }
    Ok(())
}
