//! Pagination driver.
//!
//! Materializes the full result of the configured query by issuing
//! `LIMIT/OFFSET` sub-queries in increasing offset order until a page comes
//! back empty or the page ceiling is reached.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ReportError, Result};
use crate::report::executor::QueryExecutor;
use crate::report::normalizer::scan_all;
use crate::report::sql::{has_order_by, page_sql};
use crate::warehouse::{QueryContext, ResultRow};

/// Page size used for a single page request when the caller gives none.
pub const DEFAULT_PAGE_LIMIT: i64 = 100;

/// Hard ceiling on rows per page.
pub const MAX_PAGE_LIMIT: i64 = 10_000;

/// Page size used by full materialization unless configured.
pub const DEFAULT_PAGE_SIZE: i64 = 5_000;

/// Page ceiling used by full materialization unless configured.
pub const DEFAULT_MAX_PAGES: i64 = 1_000;

/// Upper bound on the configurable page ceiling.
pub const MAX_PAGES_CEILING: i64 = 100_000;

/// Clamps a single-page limit: non-positive means the default, anything above
/// the ceiling is capped.
pub fn clamp_limit(limit: i64) -> u64 {
    if limit <= 0 {
        DEFAULT_PAGE_LIMIT as u64
    } else {
        limit.min(MAX_PAGE_LIMIT) as u64
    }
}

/// Clamps an offset to be non-negative.
pub fn clamp_offset(offset: i64) -> u64 {
    offset.max(0) as u64
}

/// Page size and page ceiling for full materialization, both already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    page_size: u64,
    max_pages: u64,
}

impl PageLimits {
    /// Builds limits from raw configured values; invalid values fall back to the defaults.
    pub fn new(page_size: Option<i64>, max_pages: Option<i64>) -> Self {
        let page_size = match page_size {
            Some(n) if n > 0 => n.min(MAX_PAGE_LIMIT),
            _ => DEFAULT_PAGE_SIZE,
        };
        let max_pages = match max_pages {
            Some(n) if n > 0 => n.min(MAX_PAGES_CEILING),
            _ => DEFAULT_MAX_PAGES,
        };
        Self {
            page_size: page_size as u64,
            max_pages: max_pages as u64,
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn max_pages(&self) -> u64 {
        self.max_pages
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of the configured query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub rows: Vec<ResultRow>,
    pub schema: Vec<String>,
    pub limit: u64,
    pub offset: u64,
}

/// Fetches one page of `base`. Limit and offset are clamped, never rejected.
pub async fn fetch_page(
    executor: &QueryExecutor,
    base: &str,
    limit: i64,
    offset: i64,
    ctx: &QueryContext,
) -> Result<Page> {
    let limit = clamp_limit(limit);
    let offset = clamp_offset(offset);
    let sql = page_sql(base, limit, offset);
    debug!("FetchPage SQL: {}", sql);

    let mut cursor = executor
        .execute(&sql, ctx)
        .await
        .map_err(|e| e.context("paged query error"))?;
    let scanned = scan_all(cursor.as_mut(), ctx)
        .await
        .map_err(|e| e.context("paged iter error"))?;

    Ok(Page {
        rows: scanned.rows,
        schema: scanned.columns,
        limit,
        offset,
    })
}

/// Result of walking every page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Materialized {
    /// Rows from every page, in page order.
    pub rows: Vec<ResultRow>,
    /// Schema of the first non-empty page; empty if there was none.
    pub schema: Vec<String>,
    /// Number of page queries issued, including the terminating empty one.
    pub pages_fetched: u64,
    /// True when the ceiling stopped the loop before an empty page was seen.
    pub truncated: bool,
}

/// Pagination states. `Done` and `Failed` are terminal.
#[derive(Debug)]
enum PageState {
    Running { offset: u64, pages: u64 },
    Done { truncated: bool },
    Failed(ReportError),
}

/// Walks the configured query page by page.
pub struct Paginator<'a> {
    executor: &'a QueryExecutor,
    base: &'a str,
    limits: PageLimits,
}

impl<'a> Paginator<'a> {
    pub fn new(executor: &'a QueryExecutor, base: &'a str, limits: PageLimits) -> Self {
        Self {
            executor,
            base,
            limits,
        }
    }

    /// Runs the loop to a terminal state.
    ///
    /// Any failed page fails the whole run; rows from earlier pages are dropped.
    pub async fn run(&self, ctx: &QueryContext) -> Result<Materialized> {
        let mut acc = Materialized::default();
        let mut state = PageState::Running { offset: 0, pages: 0 };

        loop {
            state = match state {
                PageState::Running { offset, pages } => {
                    self.step(offset, pages, &mut acc, ctx).await
                }
                PageState::Done { truncated } => {
                    acc.truncated = truncated;
                    self.report_done(&acc);
                    return Ok(acc);
                }
                PageState::Failed(err) => {
                    warn!(
                        pages = acc.pages_fetched,
                        discarded_rows = acc.rows.len(),
                        "Pagination failed: {}",
                        err
                    );
                    return Err(err);
                }
            };
        }
    }

    async fn step(
        &self,
        offset: u64,
        pages: u64,
        acc: &mut Materialized,
        ctx: &QueryContext,
    ) -> PageState {
        if pages >= self.limits.max_pages() {
            return PageState::Done { truncated: true };
        }

        let page = match fetch_page(
            self.executor,
            self.base,
            self.limits.page_size() as i64,
            offset as i64,
            ctx,
        )
        .await
        {
            Ok(page) => page,
            Err(err) => return PageState::Failed(err),
        };
        acc.pages_fetched += 1;

        if page.rows.is_empty() {
            return PageState::Done { truncated: false };
        }

        let fetched = page.rows.len() as u64;
        if acc.schema.is_empty() {
            acc.schema = page.schema;
        }
        acc.rows.extend(page.rows);

        PageState::Running {
            offset: offset + fetched,
            pages: pages + 1,
        }
    }

    fn report_done(&self, acc: &Materialized) {
        if acc.truncated {
            warn!(
                rows = acc.rows.len(),
                max_pages = self.limits.max_pages(),
                "Page ceiling reached; result truncated"
            );
        }
        if acc.pages_fetched > 1 && !has_order_by(self.base) {
            warn!(
                pages = acc.pages_fetched,
                "Query has no ORDER BY; rows may repeat or go missing across page boundaries"
            );
        }
        debug!(
            rows = acc.rows.len(),
            pages = acc.pages_fetched,
            "Pagination done"
        );
    }
}
