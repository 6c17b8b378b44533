//! Shared fixtures for integration tests.

use std::sync::Arc;
use std::time::Duration;

use bq_report::config::{ReportConfig, RequestTimeouts, ServerConfig};
use bq_report::report::{QueryExecutor, ReportService};
use bq_report::server::{self, AppState};
use bq_report::warehouse::{MockWarehouse, ResultRow, Value};
use tokio_util::sync::CancellationToken;

/// Rows `{"id": i, "label": "row-i"}` for `i` in `0..n`.
pub fn rows(n: i64) -> Vec<ResultRow> {
    (0..n)
        .map(|i| {
            let mut row = ResultRow::new();
            row.insert("id".to_string(), Value::Int(i));
            row.insert("label".to_string(), Value::from(format!("row-{i}")));
            row
        })
        .collect()
}

/// Report settings with a fixed query and page size.
pub fn report_config(query: &str, page_size: i64) -> ReportConfig {
    ReportConfig {
        query: Some(query.to_string()),
        page_size: Some(page_size),
        ..Default::default()
    }
}

pub fn service(mock: Arc<MockWarehouse>, report: &ReportConfig) -> ReportService {
    ReportService::new(QueryExecutor::new(mock, None), report)
}

/// A router plus the directory holding its dashboard and static files.
pub struct TestApp {
    pub router: axum::Router,
    pub shutdown: CancellationToken,
    pub assets: tempfile::TempDir,
}

pub fn app(mock: Arc<MockWarehouse>, report: &ReportConfig) -> TestApp {
    app_with_timeouts(mock, report, RequestTimeouts::default())
}

pub fn app_with_timeouts(
    mock: Arc<MockWarehouse>,
    report: &ReportConfig,
    timeouts: RequestTimeouts,
) -> TestApp {
    let assets = tempfile::tempdir().unwrap();
    let static_dir = assets.path().join("static");
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(assets.path().join("index.html"), "<h1>Report</h1>").unwrap();
    std::fs::write(static_dir.join("app.js"), "console.log('report');").unwrap();

    let server_config = ServerConfig {
        static_dir,
        index_file: assets.path().join("index.html"),
        ..Default::default()
    };

    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState::new(service(mock, report), timeouts, shutdown.clone()));
    TestApp {
        router: server::build_router(state, &server_config),
        shutdown,
        assets,
    }
}

pub fn short_timeouts(secs: u64) -> RequestTimeouts {
    RequestTimeouts {
        raw: Duration::from_secs(secs),
        full: Duration::from_secs(secs),
    }
}
