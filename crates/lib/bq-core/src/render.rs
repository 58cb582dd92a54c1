//! Deterministic text rendering for tool results.
//!
//! Tool output is compact JSON: an array of names for table listings, an
//! array of row objects for query results. Name order follows the backend;
//! row keys follow `serde_json`'s map ordering, so repeated renders of the
//! same data are byte-identical.

use serde_json::Value;

use crate::backend::BackendRow;

/// Renders an ordered list of table names.
#[must_use]
pub fn table_names(names: &[String]) -> String {
    Value::Array(names.iter().cloned().map(Value::String).collect()).to_string()
}

/// Renders an ordered result set as an array of row objects.
#[must_use]
pub fn rows(rows: &[BackendRow]) -> String {
    Value::Array(rows.iter().cloned().map(Value::Object).collect()).to_string()
}
