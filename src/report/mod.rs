//! Report engine.
//!
//! Wraps the configured query for paging and counting, normalizes rows into
//! a stable shape and materializes the full result page by page.

mod count;
mod executor;
mod normalizer;
mod paginator;
mod service;
pub mod sql;

pub use count::fetch_count;
pub use executor::QueryExecutor;
pub use normalizer::{scan_all, ScannedRows};
pub use paginator::{
    clamp_limit, clamp_offset, fetch_page, Materialized, Page, PageLimits, Paginator,
    DEFAULT_MAX_PAGES, DEFAULT_PAGE_LIMIT, DEFAULT_PAGE_SIZE, MAX_PAGES_CEILING, MAX_PAGE_LIMIT,
};
pub use service::{FetchResult, PageResult, ReportService};
