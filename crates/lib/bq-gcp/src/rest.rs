//! Wire types for the BigQuery v2 REST API and row decoding.
//!
//! BigQuery returns every scalar cell as a JSON string; [`decode_rows`] maps
//! cells back to typed JSON values using the result schema. RECORD and
//! REPEATED payloads are kept as the raw value the API returned.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use bq_core::BackendRow;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequestBody<'a> {
    pub query: &'a str,
    pub use_legacy_sql: bool,
    pub location: &'a str,
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_mode: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query_parameters: Vec<QueryParameter<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameter<'a> {
    pub name: &'a str,
    pub parameter_type: ParameterType<'a>,
    pub parameter_value: ParameterValue<'a>,
}

impl<'a> QueryParameter<'a> {
    pub fn string(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            parameter_type: ParameterType { kind: "STRING" },
            parameter_value: ParameterValue { value },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParameterType<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ParameterValue<'a> {
    pub value: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    #[serde(default)]
    pub job_complete: Option<bool>,
    #[serde(default)]
    pub job_reference: Option<JobReference>,
    #[serde(default)]
    pub page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub v: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetList {
    #[serde(default)]
    pub datasets: Vec<DatasetEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetEntry {
    pub dataset_reference: DatasetReference,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetReference {
    pub dataset_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableList {
    #[serde(default)]
    pub tables: Vec<TableEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableEntry {
    pub table_reference: TableReference,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    pub dataset_id: String,
    pub table_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub message: String,
}

/// Decodes one result page into ordered rows of typed values.
#[must_use]
pub fn decode_rows(schema: &TableSchema, rows: &[TableRow]) -> Vec<BackendRow> {
    rows.iter()
        .map(|row| {
            let mut out = BackendRow::new();
            for (field, cell) in schema.fields.iter().zip(&row.f) {
                out.insert(field.name.clone(), decode_cell(&field.kind, &cell.v));
            }
            out
        })
        .collect()
}

fn decode_cell(kind: &str, raw: &Value) -> Value {
    let Value::String(text) = raw else {
        // NULL cells arrive as JSON null; RECORD/REPEATED arrive structured.
        return raw.clone();
    };
    match kind {
        "INTEGER" | "INT64" => text
            .parse::<i64>()
            .map_or_else(|_| Value::String(text.clone()), Value::from),
        "FLOAT" | "FLOAT64" => text
            .parse::<f64>()
            .map_or_else(|_| Value::String(text.clone()), Value::from),
        "BOOLEAN" | "BOOL" => match text.as_str() {
            "true" => Value::from(true),
            "false" => Value::from(false),
            _ => Value::String(text.clone()),
        },
        _ => Value::String(text.clone()),
    }
}
