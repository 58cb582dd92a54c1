//! MCP server implementation for the BigQuery gateway.
//!
//! This crate owns the tool catalog and dispatcher and wires them into an
//! rmcp [`ServerHandler`]. The same handler serves both transport bindings
//! exposed by [`server`]: stdio and streamable HTTP.

pub mod catalog;
pub mod dispatch;
pub mod server;

use std::sync::Arc;

use rmcp::ServerHandler;
use rmcp::model::{
    CallToolRequestParams,
    CallToolResult,
    ErrorData,
    Implementation,
    ListToolsResult,
    PaginatedRequestParams,
    ServerCapabilities,
    ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};

use bq_core::QueryBackend;

/// Server name advertised during the capability handshake.
pub const SERVER_NAME: &str = "bigquery";

const SERVER_INSTRUCTIONS: &str = r"Query a Google BigQuery project.

Tools:
- `list-tables` lists every accessible table as `dataset.table`.
- `describe-table` returns the DDL for one table; `table_name` accepts
  `dataset.table` or `project.dataset.table`.
- `execute-query` runs a SELECT statement in BigQuery SQL and returns the
  rows as JSON.

Failures are returned as tool text starting with `Error: `.";

/// MCP handler carrying the shared backend facade.
///
/// One instance is created per session; the backend behind the `Arc` is
/// shared by all of them.
#[derive(Clone)]
pub struct BigQueryMcp {
    backend: Arc<dyn QueryBackend>,
}

impl BigQueryMcp {
    #[must_use]
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self { backend }
    }
}

impl ServerHandler for BigQueryMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Implementation::default()
            },
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(catalog::tools().to_vec())))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        async move {
            Ok(dispatch::dispatch(
                self.backend.as_ref(),
                &request.name,
                request.arguments.as_ref(),
            )
            .await)
        }
    }
}
