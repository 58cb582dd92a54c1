//! Core contract for the BigQuery MCP gateway.
//!
//! This crate defines the backend facade the gateway dispatches against: the
//! [`QueryBackend`] trait, the recoverable [`BackendError`] taxonomy, qualified
//! table name parsing, and the deterministic text rendering used for tool
//! results.

pub mod backend;
pub mod error;
pub mod render;
pub mod table;

pub use backend::{BackendRow, QueryBackend};
pub use error::BackendError;
pub use table::QualifiedTableName;
