//! Report facade used by the HTTP layer.
//!
//! Each operation takes a fresh settings snapshot, so the query text can
//! change between requests without a restart.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{FetchSettings, QuerySource, ReportConfig};
use crate::error::Result;
use crate::report::count::fetch_count;
use crate::report::executor::QueryExecutor;
use crate::report::normalizer::scan_all;
use crate::report::paginator::{fetch_page, PageLimits, Paginator};
use crate::report::sql::clean_sql;
use crate::warehouse::{QueryContext, ResultRow};

/// Full or raw result of the configured query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchResult {
    pub schema: Vec<String>,
    pub rows: Vec<ResultRow>,
    pub count: i64,
    /// Set when the page ceiling stopped materialization before every row was read.
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

/// One page of the configured query plus the total count.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageResult {
    pub schema: Vec<String>,
    pub rows: Vec<ResultRow>,
    pub count: i64,
    pub limit: u64,
    pub offset: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

/// Runs the configured report query in its different shapes.
#[derive(Clone)]
pub struct ReportService {
    executor: QueryExecutor,
    query_source: QuerySource,
    limits: PageLimits,
    expose_sql: bool,
}

impl ReportService {
    pub fn new(executor: QueryExecutor, report: &ReportConfig) -> Self {
        Self {
            executor,
            query_source: report.query_source(),
            limits: report.limits(),
            expose_sql: report.expose_sql,
        }
    }

    /// Replaces where the query text is read from.
    pub fn with_query_source(mut self, source: QuerySource) -> Self {
        self.query_source = source;
        self
    }

    /// Builds the settings one request runs with.
    pub fn snapshot(&self) -> Result<FetchSettings> {
        Ok(FetchSettings {
            query: self.query_source.load()?,
            limits: self.limits,
            expose_sql: self.expose_sql,
        })
    }

    /// Runs the query once, unpaged. The count is the number of rows read.
    pub async fn fetch_raw(&self, ctx: &QueryContext) -> Result<FetchResult> {
        let settings = self.snapshot()?;

        let mut cursor = self
            .executor
            .execute(&settings.query, ctx)
            .await
            .map_err(|e| e.context("query error"))?;
        let scanned = scan_all(cursor.as_mut(), ctx)
            .await
            .map_err(|e| e.context("iter error"))?;

        debug!(rows = scanned.rows.len(), "Raw fetch done");
        Ok(FetchResult {
            count: scanned.rows.len() as i64,
            schema: scanned.columns,
            rows: scanned.rows,
            truncated: false,
            sql: echo_sql(&settings),
        })
    }

    /// Fetches one page and the total count concurrently.
    pub async fn fetch_page(
        &self,
        limit: i64,
        offset: i64,
        ctx: &QueryContext,
    ) -> Result<PageResult> {
        let settings = self.snapshot()?;

        let (page, count) = futures::try_join!(
            fetch_page(&self.executor, &settings.query, limit, offset, ctx),
            fetch_count(&self.executor, &settings.query, ctx),
        )?;

        Ok(PageResult {
            schema: page.schema,
            rows: page.rows,
            count,
            limit: page.limit,
            offset: page.offset,
            sql: echo_sql(&settings),
        })
    }

    /// Materializes every page and fetches the total count concurrently.
    ///
    /// Either branch failing fails the call; no partial rows are returned.
    pub async fn fetch_all(&self, ctx: &QueryContext) -> Result<FetchResult> {
        let settings = self.snapshot()?;
        let paginator = Paginator::new(&self.executor, &settings.query, settings.limits);

        let (materialized, count) = futures::try_join!(
            paginator.run(ctx),
            fetch_count(&self.executor, &settings.query, ctx),
        )?;

        let truncated = materialized.truncated && (materialized.rows.len() as i64) < count;
        info!(
            rows = materialized.rows.len(),
            count,
            pages = materialized.pages_fetched,
            truncated,
            "Report materialized"
        );

        Ok(FetchResult {
            schema: materialized.schema,
            rows: materialized.rows,
            count,
            truncated,
            sql: echo_sql(&settings),
        })
    }

    /// Fetches only the total count.
    pub async fn fetch_count(&self, ctx: &QueryContext) -> Result<i64> {
        let settings = self.snapshot()?;
        fetch_count(&self.executor, &settings.query, ctx).await
    }
}

fn echo_sql(settings: &FetchSettings) -> Option<String> {
    settings
        .expose_sql
        .then(|| clean_sql(&settings.query).to_string())
}
