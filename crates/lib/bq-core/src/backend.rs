use async_trait::async_trait;

use crate::error::BackendError;

/// One result row: column name to decoded value.
pub type BackendRow = serde_json::Map<String, serde_json::Value>;

/// The three operations the gateway requires from a tabular backend.
///
/// Implementations must tolerate concurrent independent calls; the gateway
/// shares one instance across all sessions and issues at most one call per
/// session at a time.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Executes a read query and collects the full result set in order.
    /// No implicit retry is performed.
    async fn run_query(&self, sql: &str) -> Result<Vec<BackendRow>, BackendError>;

    /// Enumerates `dataset.table` names within the configured dataset
    /// allow-list, or across all datasets when the list is empty.
    async fn list_tables(&self) -> Result<Vec<String>, BackendError>;

    /// Fetches the schema definition (typically one DDL row) for a qualified
    /// table name of 2 or 3 dot-separated components.
    async fn describe_table(&self, table: &str) -> Result<Vec<BackendRow>, BackendError>;
}
