use clap::{Parser, ValueEnum};
use std::error::Error;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use bq_gcp::BigQueryConfig;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MESSAGES_PATH: &str = "/messages";

#[derive(Parser, Debug)]
#[command(name = "bq-mcpd", version, about = "BigQuery MCP gateway daemon.")]
struct CliArgs {
    /// GCP project containing the BigQuery datasets.
    #[arg(long, env = "BQ_PROJECT")]
    project: Option<String>,

    /// BigQuery location/region, e.g. europe-west4.
    #[arg(long, env = "BQ_LOCATION")]
    location: Option<String>,

    /// Service account JSON key file. Omit to use ambient credentials.
    #[arg(long, env = "BQ_KEY_FILE")]
    key_file: Option<PathBuf>,

    /// Restrict access to these datasets. Repeatable.
    #[arg(long = "dataset", env = "BQ_DATASETS", value_delimiter = ',')]
    datasets: Vec<String>,

    #[arg(long, env = "BQ_TRANSPORT", value_enum, default_value = "stdio")]
    transport: TransportKind,

    /// Listen port for the HTTP transport.
    #[arg(long, env = "BQ_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Path serving the MCP event stream on the HTTP transport.
    #[arg(long, env = "BQ_MESSAGES_PATH", default_value = DEFAULT_MESSAGES_PATH)]
    messages_path: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    Stdio,
    Http,
}

/// Runtime configuration loaded from CLI arguments and environment
/// variables, flags taking precedence.
#[derive(Debug, Clone)]
pub struct McpdConfig {
    pub bigquery: BigQueryConfig,
    pub transport: TransportKind,
    pub http_addr: SocketAddr,
    pub messages_path: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl McpdConfig {
    /// Parses flags and environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for settings clap cannot reject itself.
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::try_from(CliArgs::parse())
    }
}

impl TryFrom<CliArgs> for McpdConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if !args.messages_path.starts_with('/') {
            return Err(ConfigError::InvalidSetting {
                name: "BQ_MESSAGES_PATH",
                value: args.messages_path,
            });
        }

        let datasets = args
            .datasets
            .into_iter()
            .filter(|value| !value.trim().is_empty())
            .collect();

        Ok(Self {
            bigquery: BigQueryConfig {
                project: args.project,
                location: args.location,
                key_file: args.key_file,
                datasets,
            },
            transport: args.transport,
            http_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), args.port),
            messages_path: args.messages_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            project: Some("proj".to_string()),
            location: Some("europe-west4".to_string()),
            key_file: None,
            datasets: Vec::new(),
            transport: TransportKind::Stdio,
            port: DEFAULT_PORT,
            messages_path: DEFAULT_MESSAGES_PATH.to_string(),
        }
    }

    #[test]
    fn defaults_map_through() {
        let config = McpdConfig::try_from(base_args()).expect("config should parse");
        assert_eq!(config.transport, TransportKind::Stdio);
        assert_eq!(config.http_addr.port(), DEFAULT_PORT);
        assert_eq!(config.messages_path, "/messages");
        assert!(config.bigquery.datasets.is_empty());
    }

    #[test]
    fn blank_dataset_entries_are_dropped() {
        let mut args = base_args();
        args.datasets = vec!["ds1".to_string(), " ".to_string(), "ds2".to_string()];
        let config = McpdConfig::try_from(args).expect("config should parse");
        assert_eq!(config.bigquery.datasets, vec!["ds1", "ds2"]);
    }

    #[test]
    fn messages_path_must_be_absolute() {
        let mut args = base_args();
        args.messages_path = "messages".to_string();
        let err = McpdConfig::try_from(args).expect_err("relative path should fail");
        assert!(err.to_string().contains("BQ_MESSAGES_PATH"));
    }
}
