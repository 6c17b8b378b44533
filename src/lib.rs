//! bq-report - a paginated, schema-stable JSON report service over BigQuery.
//!
//! This library exposes the core modules for use in integration tests.

pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod server;
pub mod warehouse;
