//! The fixed tool catalog advertised to clients.
//!
//! Three descriptors in fixed order, built once and immutable for the
//! process lifetime. The dispatcher derives its required-argument checks
//! from these schemas, so the catalog and the dispatcher cannot drift apart.

use std::sync::{Arc, OnceLock};

use rmcp::model::Tool;
use serde_json::{Value, json};

pub const EXECUTE_QUERY: &str = "execute-query";
pub const LIST_TABLES: &str = "list-tables";
pub const DESCRIBE_TABLE: &str = "describe-table";

static CATALOG: OnceLock<Vec<Tool>> = OnceLock::new();

/// Returns the catalog in its advertised order.
#[must_use]
pub fn tools() -> &'static [Tool] {
    CATALOG.get_or_init(build).as_slice()
}

fn build() -> Vec<Tool> {
    vec![
        tool(
            EXECUTE_QUERY,
            "Execute a SELECT query on the BigQuery database",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "SELECT SQL query to execute using BigQuery dialect",
                    },
                },
                "required": ["query"],
            }),
        ),
        tool(
            LIST_TABLES,
            "List all tables in the BigQuery database",
            json!({
                "type": "object",
                "properties": {},
            }),
        ),
        tool(
            DESCRIBE_TABLE,
            "Get the schema information for a specific table",
            json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Name of the table to describe (e.g. my_dataset.my_table)",
                    },
                },
                "required": ["table_name"],
            }),
        ),
    ]
}

/// Looks up a descriptor by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static Tool> {
    tools().iter().find(|tool| tool.name.as_ref() == name)
}

/// Field names the descriptor's schema marks as required.
#[must_use]
pub fn required_fields(tool: &Tool) -> Vec<String> {
    tool.input_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn tool(name: &'static str, description: &'static str, schema: Value) -> Tool {
    let input_schema = schema.as_object().cloned().unwrap_or_default();
    Tool {
        name: name.into(),
        title: None,
        description: Some(description.into()),
        input_schema: Arc::new(input_schema),
        output_schema: None,
        annotations: None,
        execution: None,
        icons: None,
        meta: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_three_tools_in_fixed_order() {
        let names: Vec<String> = tools()
            .iter()
            .map(|tool| tool.name.to_string())
            .collect();
        assert_eq!(names, vec![EXECUTE_QUERY, LIST_TABLES, DESCRIBE_TABLE]);
    }

    #[test]
    fn tool_names_are_unique() {
        let mut names: Vec<String> = tools()
            .iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn catalog_listing_is_idempotent() {
        let first = serde_json::to_string(tools()).expect("catalog serializes");
        let second = serde_json::to_string(tools()).expect("catalog serializes");
        assert_eq!(first, second);
    }

    #[test]
    fn catalog_is_built_once() {
        assert!(std::ptr::eq(tools(), tools()));
        let fresh = serde_json::to_string(&build()).expect("catalog serializes");
        let served = serde_json::to_string(tools()).expect("catalog serializes");
        assert_eq!(fresh, served);
    }

    #[test]
    fn required_fields_follow_the_schemas() {
        let execute = find(EXECUTE_QUERY).expect("execute-query exists");
        assert_eq!(required_fields(execute), vec!["query".to_string()]);

        let list = find(LIST_TABLES).expect("list-tables exists");
        assert!(required_fields(list).is_empty());

        let describe = find(DESCRIBE_TABLE).expect("describe-table exists");
        assert_eq!(required_fields(describe), vec!["table_name".to_string()]);
    }

    #[test]
    fn unknown_name_is_absent() {
        assert!(find("frobnicate").is_none());
    }
}
