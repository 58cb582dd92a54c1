use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use bq_core::{BackendError, BackendRow, QualifiedTableName, QueryBackend};

use crate::SetupError;
use crate::auth::TokenProvider;
use crate::rest::{
    ApiErrorEnvelope,
    DatasetList,
    QueryParameter,
    QueryRequestBody,
    QueryResponse,
    TableList,
    TableSchema,
    decode_rows,
};

const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";
const QUERY_TIMEOUT_MS: u64 = 30_000;
const POLL_TIMEOUT_MS: &str = "10000";
const LIST_PAGE_SIZE: &str = "1000";

/// Settings for [`BigQueryBackend::new`]. Project and location are required;
/// the key file and dataset allow-list are optional.
#[derive(Debug, Clone, Default)]
pub struct BigQueryConfig {
    pub project: Option<String>,
    pub location: Option<String>,
    pub key_file: Option<PathBuf>,
    pub datasets: Vec<String>,
}

/// BigQuery-backed implementation of the gateway's query facade.
///
/// One instance is shared across all sessions; the underlying HTTP client
/// and token cache tolerate concurrent calls.
#[derive(Debug)]
pub struct BigQueryBackend {
    http: reqwest::Client,
    tokens: TokenProvider,
    project: String,
    location: String,
    datasets: Vec<String>,
    base_url: String,
}

impl BigQueryBackend {
    /// Validates the configuration and prepares credentials.
    ///
    /// # Errors
    /// Returns [`SetupError::MissingProject`] or
    /// [`SetupError::MissingLocation`] when a required setting is absent, and
    /// [`SetupError::Credential`] when the key file is unusable.
    pub fn new(config: BigQueryConfig) -> Result<Self, SetupError> {
        let project = config
            .project
            .filter(|value| !value.trim().is_empty())
            .ok_or(SetupError::MissingProject)?;
        let location = config
            .location
            .filter(|value| !value.trim().is_empty())
            .ok_or(SetupError::MissingLocation)?;

        let http = reqwest::Client::new();
        let tokens = match &config.key_file {
            Some(path) => TokenProvider::from_key_file(path, http.clone())?,
            None => TokenProvider::metadata(http.clone()),
        };

        info!(
            %project,
            %location,
            key_file = config.key_file.is_some(),
            datasets = config.datasets.len(),
            "initialized BigQuery backend"
        );
        Ok(Self {
            http,
            tokens,
            project,
            location,
            datasets: config.datasets,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Points the client at an alternate API endpoint (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Runs a query, polling until the job completes and following result
    /// pages, and returns the decoded rows in order.
    async fn execute(
        &self,
        sql: &str,
        parameters: Vec<QueryParameter<'_>>,
    ) -> Result<Vec<BackendRow>, BackendError> {
        debug!(sql, "executing query");
        let token = self.tokens.access_token().await?;
        let body = QueryRequestBody {
            query: sql,
            use_legacy_sql: false,
            location: &self.location,
            timeout_ms: QUERY_TIMEOUT_MS,
            parameter_mode: if parameters.is_empty() { None } else { Some("NAMED") },
            query_parameters: parameters,
        };
        let reply = self
            .http
            .post(format!("{}/projects/{}/queries", self.base_url, self.project))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(transport_err)?;
        let mut page: QueryResponse = read_response(reply).await?;

        let mut schema: Option<TableSchema> = None;
        let mut rows = Vec::new();
        loop {
            if let Some(fresh) = page.schema.take() {
                schema = Some(fresh);
            }
            let complete = page.job_complete.unwrap_or(false);
            if complete {
                if let Some(schema) = &schema {
                    rows.extend(decode_rows(schema, &page.rows));
                }
                if page.page_token.is_none() {
                    break;
                }
            }

            let job_id = page
                .job_reference
                .as_ref()
                .map(|job| job.job_id.clone())
                .ok_or_else(|| {
                    BackendError::Api("query response missing job reference".to_string())
                })?;
            let mut request = self
                .http
                .get(format!(
                    "{}/projects/{}/queries/{job_id}",
                    self.base_url, self.project
                ))
                .bearer_auth(&token)
                .query(&[("location", self.location.as_str())]);
            if !complete {
                request = request.query(&[("timeoutMs", POLL_TIMEOUT_MS)]);
            }
            if let Some(page_token) = page.page_token.take() {
                request = request.query(&[("pageToken", page_token.as_str())]);
            }
            page = read_response(request.send().await.map_err(transport_err)?).await?;
        }

        debug!(count = rows.len(), "query returned rows");
        Ok(rows)
    }

    async fn dataset_ids(&self, token: &str) -> Result<Vec<String>, BackendError> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(format!("{}/projects/{}/datasets", self.base_url, self.project))
                .bearer_auth(token)
                .query(&[("maxResults", LIST_PAGE_SIZE)]);
            if let Some(page_token) = &page_token {
                request = request.query(&[("pageToken", page_token.as_str())]);
            }
            let page: DatasetList =
                read_response(request.send().await.map_err(transport_err)?).await?;
            ids.extend(
                page.datasets
                    .into_iter()
                    .map(|entry| entry.dataset_reference.dataset_id),
            );
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(ids)
    }

    async fn tables_in_dataset(
        &self,
        token: &str,
        dataset: &str,
    ) -> Result<Vec<String>, BackendError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(format!(
                    "{}/projects/{}/datasets/{dataset}/tables",
                    self.base_url, self.project
                ))
                .bearer_auth(token)
                .query(&[("maxResults", LIST_PAGE_SIZE)]);
            if let Some(page_token) = &page_token {
                request = request.query(&[("pageToken", page_token.as_str())]);
            }
            let page: TableList =
                read_response(request.send().await.map_err(transport_err)?).await?;
            names.extend(page.tables.into_iter().map(|entry| {
                format!(
                    "{}.{}",
                    entry.table_reference.dataset_id, entry.table_reference.table_id
                )
            }));
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl QueryBackend for BigQueryBackend {
    async fn run_query(&self, sql: &str) -> Result<Vec<BackendRow>, BackendError> {
        self.execute(sql, Vec::new()).await
    }

    async fn list_tables(&self) -> Result<Vec<String>, BackendError> {
        debug!("listing tables");
        let token = self.tokens.access_token().await?;
        let datasets = if self.datasets.is_empty() {
            self.dataset_ids(&token).await?
        } else {
            self.datasets.clone()
        };
        debug!(count = datasets.len(), "scanning datasets");

        let mut tables = Vec::new();
        for dataset in &datasets {
            tables.extend(self.tables_in_dataset(&token, dataset).await?);
        }
        debug!(count = tables.len(), "found tables");
        Ok(tables)
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<BackendRow>, BackendError> {
        debug!(table, "describing table");
        let name = QualifiedTableName::parse(table)?;
        let sql = format!(
            "SELECT ddl FROM {}.INFORMATION_SCHEMA.TABLES WHERE table_name = @table_name;",
            name.dataset
        );
        let parameters = vec![QueryParameter::string("table_name", &name.table)];
        self.execute(&sql, parameters).await
    }
}

fn transport_err(err: reqwest::Error) -> BackendError {
    BackendError::Transport(format!("BigQuery request failed: {err}"))
}

async fn read_response<T: DeserializeOwned>(reply: reqwest::Response) -> Result<T, BackendError> {
    let status = reply.status();
    if status.is_success() {
        return reply
            .json::<T>()
            .await
            .map_err(|err| BackendError::Api(format!("malformed BigQuery response: {err}")));
    }
    let body = reply.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiErrorEnvelope>(&body) {
        Ok(envelope) => Err(BackendError::Api(envelope.error.message)),
        Err(_) => Err(BackendError::Api(format!(
            "BigQuery API returned status {status}"
        ))),
    }
}
