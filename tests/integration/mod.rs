//! Integration tests for bq-report.
//!
//! The BigQuery tests skip unless BQ_TEST_PROJECT is set.

pub mod bigquery_test;
pub mod common;
pub mod report_test;
pub mod server_test;
