//! Routing of tool invocations to the backend facade.
//!
//! [`dispatch`] is total: unknown tools, missing arguments, and every backend
//! failure come back as a single text content item prefixed with `"Error: "`.
//! The protocol-level call itself always succeeds.

use rmcp::model::{CallToolResult, Content};
use serde_json::{Map, Value};
use tracing::debug;

use bq_core::{QueryBackend, render};

use crate::catalog;

type Arguments = Map<String, Value>;

/// Handles one invocation request and produces exactly one content item.
pub async fn dispatch(
    backend: &dyn QueryBackend,
    name: &str,
    arguments: Option<&Arguments>,
) -> CallToolResult {
    debug!(tool = name, "handling tool invocation");
    let text = match run(backend, name, arguments).await {
        Ok(text) => text,
        Err(message) => format!("Error: {message}"),
    };
    CallToolResult::success(vec![Content::text(text)])
}

async fn run(
    backend: &dyn QueryBackend,
    name: &str,
    arguments: Option<&Arguments>,
) -> Result<String, String> {
    match name {
        catalog::LIST_TABLES => {
            check_required_arguments(name, arguments)?;
            let tables = backend.list_tables().await.map_err(|err| err.to_string())?;
            Ok(render::table_names(&tables))
        }
        catalog::DESCRIBE_TABLE => {
            check_required_arguments(name, arguments)?;
            let table = string_argument(arguments, "table_name")?;
            let rows = backend
                .describe_table(table)
                .await
                .map_err(|err| err.to_string())?;
            Ok(render::rows(&rows))
        }
        catalog::EXECUTE_QUERY => {
            check_required_arguments(name, arguments)?;
            let sql = string_argument(arguments, "query")?;
            let rows = backend
                .run_query(sql)
                .await
                .map_err(|err| err.to_string())?;
            Ok(render::rows(&rows))
        }
        other => Err(format!("Unknown tool: {other}")),
    }
}

fn check_required_arguments(name: &str, arguments: Option<&Arguments>) -> Result<(), String> {
    let required = catalog::find(name)
        .map(catalog::required_fields)
        .unwrap_or_default();
    for field in required {
        if !arguments.is_some_and(|arguments| arguments.contains_key(&field)) {
            return Err(format!("Missing {field} argument"));
        }
    }
    Ok(())
}

fn string_argument<'a>(
    arguments: Option<&'a Arguments>,
    field: &str,
) -> Result<&'a str, String> {
    arguments
        .and_then(|arguments| arguments.get(field))
        .and_then(Value::as_str)
        .ok_or_else(|| format!("Invalid {field} argument: expected a string"))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use bq_core::{BackendError, BackendRow};

    use super::*;

    #[derive(Default)]
    struct FakeBackend {
        tables: Vec<String>,
        rows: Vec<BackendRow>,
        failure: Option<BackendError>,
    }

    impl FakeBackend {
        fn failing(failure: BackendError) -> Self {
            Self {
                failure: Some(failure),
                ..Self::default()
            }
        }

        fn check(&self) -> Result<(), BackendError> {
            self.failure.clone().map_or(Ok(()), Err)
        }
    }

    #[async_trait]
    impl QueryBackend for FakeBackend {
        async fn run_query(&self, _sql: &str) -> Result<Vec<BackendRow>, BackendError> {
            self.check()?;
            Ok(self.rows.clone())
        }

        async fn list_tables(&self) -> Result<Vec<String>, BackendError> {
            self.check()?;
            Ok(self.tables.clone())
        }

        async fn describe_table(&self, table: &str) -> Result<Vec<BackendRow>, BackendError> {
            bq_core::QualifiedTableName::parse(table)?;
            self.check()?;
            Ok(self.rows.clone())
        }
    }

    fn arguments(value: Value) -> Arguments {
        value.as_object().cloned().unwrap_or_default()
    }

    fn single_text(result: &CallToolResult) -> String {
        let value = serde_json::to_value(result).expect("result serializes");
        let content = value["content"].as_array().expect("content array");
        assert_eq!(content.len(), 1, "dispatcher must return exactly one item");
        assert_eq!(content[0]["type"], "text");
        content[0]["text"].as_str().expect("text item").to_string()
    }

    #[tokio::test]
    async fn lists_tables_in_order() {
        let backend = FakeBackend {
            tables: vec!["ds1.t1".to_string(), "ds1.t2".to_string()],
            ..FakeBackend::default()
        };
        let result = dispatch(&backend, catalog::LIST_TABLES, None).await;
        assert_eq!(single_text(&result), r#"["ds1.t1","ds1.t2"]"#);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_as_text() {
        let backend = FakeBackend::default();
        let result = dispatch(&backend, "frobnicate", None).await;
        assert_eq!(single_text(&result), "Error: Unknown tool: frobnicate");
    }

    #[tokio::test]
    async fn describe_without_table_name_is_reported() {
        let backend = FakeBackend::default();
        let args = arguments(json!({}));
        let result = dispatch(&backend, catalog::DESCRIBE_TABLE, Some(&args)).await;
        assert_eq!(single_text(&result), "Error: Missing table_name argument");
    }

    #[tokio::test]
    async fn describe_without_arguments_is_reported() {
        let backend = FakeBackend::default();
        let result = dispatch(&backend, catalog::DESCRIBE_TABLE, None).await;
        assert_eq!(single_text(&result), "Error: Missing table_name argument");
    }

    #[tokio::test]
    async fn describe_with_four_components_is_invalid() {
        let backend = FakeBackend::default();
        let args = arguments(json!({"table_name": "a.b.c.d"}));
        let result = dispatch(&backend, catalog::DESCRIBE_TABLE, Some(&args)).await;
        assert!(single_text(&result).contains("Invalid table name"));
    }

    #[tokio::test]
    async fn describe_renders_ddl_rows() {
        let mut row = BackendRow::new();
        row.insert("ddl".to_string(), Value::from("CREATE TABLE t1"));
        let backend = FakeBackend {
            rows: vec![row],
            ..FakeBackend::default()
        };
        let args = arguments(json!({"table_name": "ds1.t1"}));
        let result = dispatch(&backend, catalog::DESCRIBE_TABLE, Some(&args)).await;
        assert_eq!(single_text(&result), r#"[{"ddl":"CREATE TABLE t1"}]"#);
    }

    #[tokio::test]
    async fn query_without_query_argument_is_reported() {
        let backend = FakeBackend::default();
        let result = dispatch(&backend, catalog::EXECUTE_QUERY, None).await;
        assert_eq!(single_text(&result), "Error: Missing query argument");
    }

    #[tokio::test]
    async fn non_string_query_argument_is_reported() {
        let backend = FakeBackend::default();
        let args = arguments(json!({"query": 42}));
        let result = dispatch(&backend, catalog::EXECUTE_QUERY, Some(&args)).await;
        assert_eq!(
            single_text(&result),
            "Error: Invalid query argument: expected a string"
        );
    }

    #[tokio::test]
    async fn backend_permission_fault_surfaces_its_message() {
        let backend = FakeBackend::failing(BackendError::Api(
            "Access Denied: project proj".to_string(),
        ));
        let args = arguments(json!({"query": "SELECT 1"}));
        let result = dispatch(&backend, catalog::EXECUTE_QUERY, Some(&args)).await;
        let text = single_text(&result);
        assert!(text.starts_with("Error: "));
        assert!(text.contains("Access Denied: project proj"));
    }

    #[tokio::test]
    async fn every_catalog_tool_yields_one_item_on_minimal_input() {
        let backend = FakeBackend::default();
        for (name, args) in [
            (catalog::EXECUTE_QUERY, Some(json!({"query": "SELECT 1"}))),
            (catalog::LIST_TABLES, None),
            (catalog::DESCRIBE_TABLE, Some(json!({"table_name": "a.b"}))),
        ] {
            let args = args.map(arguments);
            let result = dispatch(&backend, name, args.as_ref()).await;
            single_text(&result);
        }
    }
}
