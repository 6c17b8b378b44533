//! HTTP surface tests.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bq_report::server;
use bq_report::warehouse::MockWarehouse;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::{app, app_with_timeouts, report_config, rows, short_timeouts};

/// Sends a GET and returns status plus raw body.
async fn get(router: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(router: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(router, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_healthz() {
    let app = app(Arc::new(MockWarehouse::demo()), &report_config("SELECT 1", 10));
    let (status, body) = get(&app.router, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_report_single_row() {
    let mut row = bq_report::warehouse::ResultRow::new();
    row.insert("a".to_string(), bq_report::warehouse::Value::Int(1));
    let app = app(
        Arc::new(MockWarehouse::new(vec![row])),
        &report_config("SELECT 1 AS a", 5000),
    );

    let (status, json) = get_json(&app.router, "/report").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"schema": ["a"], "rows": [{"a": 1}], "count": 1, "truncated": false})
    );
}

#[tokio::test]
async fn test_report_empty_result() {
    let app = app(Arc::new(MockWarehouse::empty()), &report_config("SELECT a FROM t", 5000));

    let (status, json) = get_json(&app.router, "/report").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"schema": [], "rows": [], "count": 0, "truncated": false})
    );
}

#[tokio::test]
async fn test_report_exposes_sql_when_enabled() {
    let config = bq_report::config::ReportConfig {
        expose_sql: true,
        ..report_config("SELECT id FROM t;", 10)
    };
    let app = app(Arc::new(MockWarehouse::new(rows(2))), &config);

    let (_, json) = get_json(&app.router, "/report").await;
    assert_eq!(json["sql"], "SELECT id FROM t");
}

#[tokio::test]
async fn test_report_page_params() {
    let app = app(Arc::new(MockWarehouse::demo()), &report_config("SELECT * FROM projects", 10));

    let (status, json) = get_json(&app.router, "/report/page?limit=5&offset=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["limit"], 5);
    assert_eq!(json["offset"], 10);
    assert_eq!(json["count"], 42);
    assert_eq!(json["rows"].as_array().unwrap().len(), 5);
    assert_eq!(json["rows"][0]["project_id"], 11);
}

#[tokio::test]
async fn test_report_page_clamps_bad_params() {
    let app = app(Arc::new(MockWarehouse::demo()), &report_config("SELECT * FROM projects", 10));

    let (status, json) = get_json(&app.router, "/report/page?limit=-3&offset=nope").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["limit"], 100);
    assert_eq!(json["offset"], 0);

    let (_, json) = get_json(&app.router, "/report/page?limit=999999").await;
    assert_eq!(json["limit"], 10000);
}

#[tokio::test]
async fn test_report_raw_and_count() {
    let app = app(Arc::new(MockWarehouse::new(rows(12))), &report_config("SELECT id FROM t", 5));

    let (status, json) = get_json(&app.router, "/report/raw").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 12);
    assert_eq!(json["rows"].as_array().unwrap().len(), 12);

    let (status, json) = get_json(&app.router, "/report/count").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"count": 12}));
}

#[tokio::test]
async fn test_report_failure_is_500_json() {
    let mock = MockWarehouse::new(rows(25)).failing_at_offset(10);
    let app = app(Arc::new(mock), &report_config("SELECT id FROM t", 10));

    let (status, json) = get_json(&app.router, "/report").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json,
        json!({"error": "Query error: paged query error: mock failure at offset 10"})
    );
}

#[tokio::test(start_paused = true)]
async fn test_report_timeout_is_500_json() {
    let mock = MockWarehouse::demo().with_delay(Duration::from_secs(10));
    let app = app_with_timeouts(Arc::new(mock), &report_config("SELECT 1", 10), short_timeouts(5));

    let (status, json) = get_json(&app.router, "/report/raw").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().starts_with("Timeout:"));
}

#[tokio::test]
async fn test_report_with_unbounded_deadline() {
    let app = app_with_timeouts(
        Arc::new(MockWarehouse::demo()),
        &report_config("SELECT * FROM projects", 10),
        short_timeouts(u64::MAX),
    );

    let (status, json) = get_json(&app.router, "/report").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 42);
}

#[tokio::test]
async fn test_shutdown_cancels_requests() {
    let app = app(Arc::new(MockWarehouse::demo()), &report_config("SELECT 1", 10));
    app.shutdown.cancel();

    let (status, json) = get_json(&app.router, "/report").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().starts_with("Cancelled:"));
}

#[tokio::test]
async fn test_serves_dashboard_and_static_files() {
    let app = app(Arc::new(MockWarehouse::demo()), &report_config("SELECT 1", 10));

    let (status, body) = get(&app.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>Report</h1>");

    let (status, body) = get(&app.router, "/static/app.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"console.log('report');");

    let (status, _) = get(&app.router, "/static/missing.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_end_to_end_over_tcp() {
    let app = app(Arc::new(MockWarehouse::demo()), &report_config("SELECT * FROM projects", 10));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = app.shutdown.clone();
    let handle = tokio::spawn(server::serve(listener, app.router.clone(), shutdown.clone()));

    let body: Value = reqwest::get(format!("http://{addr}/report"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 42);
    assert_eq!(body["rows"].as_array().unwrap().len(), 42);
    assert_eq!(body["schema"][0], "project_id");

    shutdown.cancel();
    handle.await.unwrap().unwrap();
}
