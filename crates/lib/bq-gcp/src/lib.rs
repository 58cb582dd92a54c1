//! BigQuery backend for the MCP gateway.
//!
//! Implements the `bq-core` facade over the BigQuery v2 REST API: query
//! execution with job polling and result paging, dataset/table enumeration,
//! and schema lookup via `INFORMATION_SCHEMA`. Authentication uses a service
//! account key (RS256 JWT grant) when one is configured, otherwise the GCE
//! metadata server.

mod auth;
mod client;
mod rest;

use std::error::Error;
use std::fmt;

pub use client::{BigQueryBackend, BigQueryConfig};

/// Fatal construction-time failure. Unlike [`bq_core::BackendError`] these
/// abort startup instead of being surfaced as tool content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    MissingProject,
    MissingLocation,
    /// The configured credential reference is unusable (unreadable file,
    /// malformed JSON, wrong key type, invalid private key).
    Credential(String),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingProject => write!(f, "missing required setting: project"),
            Self::MissingLocation => write!(f, "missing required setting: location"),
            Self::Credential(message) => {
                write!(f, "unusable credential reference: {message}")
            }
        }
    }
}

impl Error for SetupError {}
