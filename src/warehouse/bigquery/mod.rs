//! BigQuery warehouse client implementation.
//!
//! Provides the `BigQueryClient` struct that implements the `WarehouseClient`
//! trait using gcp-bigquery-client, plus the server-paginated cursor it hands out.

mod wire;

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::get_query_results_parameters::GetQueryResultsParameters;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::yup_oauth2::parse_service_account_key;
use gcp_bigquery_client::Client;
use tracing::{debug, info};

use crate::error::{ReportError, Result};
use crate::warehouse::{
    ConnectionSettings, Credentials, Record, RowCursor, Statement, WarehouseClient,
};
use wire::{decode_row, ResultPage, WireField, WireRow};

/// Rows requested per REST round trip; the cursor follows page tokens for the rest.
const MAX_RESULTS_PER_CALL: i32 = 10_000;

/// Server-side wait per call when the caller gave no deadline.
const DEFAULT_WAIT_MS: i32 = 10_000;

/// BigQuery warehouse client.
///
/// Cheap to clone; the underlying HTTP client and token cache are shared.
#[derive(Clone)]
pub struct BigQueryClient {
    client: Client,
    project_id: String,
    location: Option<String>,
}

impl std::fmt::Debug for BigQueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigQueryClient")
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .finish()
    }
}

impl BigQueryClient {
    /// Builds a client from the resolved credential source.
    ///
    /// No retry: a failure here is fatal to startup.
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self> {
        let source = settings.credentials.source();
        info!(
            project = %settings.project_id,
            location = settings.location.as_deref().unwrap_or("default"),
            credentials = source,
            "Connecting to BigQuery"
        );

        let wrap = |e: &dyn std::fmt::Display| {
            ReportError::connection(format!("bigquery client ({source}) error: {e}"))
        };

        let client = match &settings.credentials {
            Credentials::Inline(json) => {
                let key = parse_service_account_key(json).map_err(|e| wrap(&e))?;
                Client::from_service_account_key(key, false)
                    .await
                    .map_err(|e| wrap(&e))?
            }
            Credentials::File(path) => {
                Client::from_service_account_key_file(&path.to_string_lossy())
                    .await
                    .map_err(|e| wrap(&e))?
            }
            Credentials::Ambient => Client::from_application_default_credentials()
                .await
                .map_err(|e| wrap(&e))?,
        };

        Ok(Self {
            client,
            project_id: settings.project_id.clone(),
            location: settings.location.clone(),
        })
    }

    async fn poll_results(
        &self,
        job_id: &str,
        location: Option<&str>,
        page_token: Option<String>,
        wait_ms: i32,
    ) -> Result<ResultPage> {
        let params = GetQueryResultsParameters {
            location: location.map(str::to_string),
            page_token,
            max_results: Some(MAX_RESULTS_PER_CALL),
            timeout_ms: Some(wait_ms),
            ..Default::default()
        };
        let response = self
            .client
            .job()
            .get_query_results(&self.project_id, job_id, params)
            .await
            .map_err(map_bq_error)?;
        ResultPage::from_model(&response)
    }
}

#[async_trait]
impl WarehouseClient for BigQueryClient {
    async fn query(&self, statement: Statement) -> Result<Box<dyn RowCursor>> {
        let location = statement.location.or_else(|| self.location.clone());
        let wait_ms = wait_ms(statement.timeout);

        let mut request = QueryRequest::new(statement.sql);
        request.use_legacy_sql = false;
        request.location = location.clone();
        request.max_results = Some(MAX_RESULTS_PER_CALL);
        request.timeout_ms = Some(wait_ms);

        let response = self
            .client
            .job()
            .query(&self.project_id, request)
            .await
            .map_err(map_bq_error)?;
        let mut page = ResultPage::from_model(&response)?;

        let job_id = page.job_id().map(str::to_string);
        let location = page.job_location().map(str::to_string).or(location);

        // jobs.query returns before the job finishes when it outlives the wait;
        // the caller's deadline bounds this loop.
        while !page.is_complete() {
            let Some(job_id) = job_id.as_deref() else {
                return Err(ReportError::query(
                    "query did not complete and returned no job reference",
                ));
            };
            debug!(job_id, "BigQuery job still running, polling");
            page = self
                .poll_results(job_id, location.as_deref(), None, wait_ms)
                .await?;
        }

        Ok(Box::new(BigQueryCursor::new(self.clone(), job_id, location, page)))
    }

    fn name(&self) -> &'static str {
        "bigquery"
    }
}

/// Forward-only cursor over a finished BigQuery job.
struct BigQueryCursor {
    client: BigQueryClient,
    job_id: Option<String>,
    location: Option<String>,
    fields: Vec<WireField>,
    columns: Vec<String>,
    buffered: VecDeque<WireRow>,
    page_token: Option<String>,
}

impl BigQueryCursor {
    fn new(
        client: BigQueryClient,
        job_id: Option<String>,
        location: Option<String>,
        mut first: ResultPage,
    ) -> Self {
        let fields = first.take_fields();
        let columns = fields.iter().map(|f| f.name.clone()).collect();
        Self {
            client,
            job_id,
            location,
            fields,
            columns,
            buffered: first.rows.take().unwrap_or_default().into(),
            page_token: first.page_token.take(),
        }
    }
}

#[async_trait]
impl RowCursor for BigQueryCursor {
    fn columns(&self) -> Option<&[String]> {
        if self.columns.is_empty() {
            None
        } else {
            Some(&self.columns)
        }
    }

    async fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(row) = self.buffered.pop_front() {
                return decode_row(&self.fields, row).map(|values| Some(Record::Positional(values)));
            }

            let Some(token) = self.page_token.take() else {
                return Ok(None);
            };
            let Some(job_id) = self.job_id.as_deref() else {
                return Err(ReportError::query("result has more pages but no job reference"));
            };

            debug!(job_id, "Fetching next BigQuery result page");
            let mut page = self
                .client
                .poll_results(job_id, self.location.as_deref(), Some(token), DEFAULT_WAIT_MS)
                .await?;
            if self.fields.is_empty() {
                self.fields = page.take_fields();
                self.columns = self.fields.iter().map(|f| f.name.clone()).collect();
            }
            self.buffered.extend(page.rows.take().unwrap_or_default());
            self.page_token = page.page_token.take();
        }
    }
}

fn wait_ms(timeout: Option<Duration>) -> i32 {
    timeout
        .map(|t| t.as_millis().clamp(1, i32::MAX as u128) as i32)
        .unwrap_or(DEFAULT_WAIT_MS)
}

fn map_bq_error(err: BQError) -> ReportError {
    ReportError::query(err.to_string())
}
