//! Report engine integration tests against the in-memory warehouse.

use std::sync::Arc;
use std::time::Duration;

use bq_report::error::ReportError;
use bq_report::report::{PageLimits, Paginator, QueryExecutor};
use bq_report::warehouse::{MockWarehouse, QueryContext, Value};
use pretty_assertions::assert_eq;

use super::common::{report_config, rows, service};

fn ctx() -> QueryContext {
    QueryContext::with_timeout(Duration::from_secs(30))
}

#[tokio::test]
async fn test_full_fetch_matches_dataset_in_order() {
    let mock = Arc::new(MockWarehouse::new(rows(1234)));
    let service = service(mock.clone(), &report_config("SELECT id, label FROM t ORDER BY id", 500));

    let result = service.fetch_all(&ctx()).await.unwrap();
    assert_eq!(result.rows.len(), 1234);
    assert_eq!(result.count, 1234);
    assert_eq!(result.schema, vec!["id", "label"]);
    assert!(!result.truncated);

    let ids: Vec<Value> = result.rows.iter().map(|r| r["id"].clone()).collect();
    let expected: Vec<Value> = (0..1234).map(Value::Int).collect();
    assert_eq!(ids, expected);

    // 3 pages with rows, 1 empty page, 1 count.
    assert_eq!(mock.call_count(), 5);
}

#[tokio::test]
async fn test_loop_terminates_at_ceiling() {
    let mock = Arc::new(MockWarehouse::new(rows(100)));
    let config = bq_report::config::ReportConfig {
        max_pages: Some(3),
        ..report_config("SELECT id FROM t ORDER BY id", 1)
    };
    let service = service(mock.clone(), &config);

    let result = service.fetch_all(&ctx()).await.unwrap();
    assert_eq!(result.rows.len(), 3);
    assert_eq!(result.count, 100);
    assert!(result.truncated);
    assert_eq!(mock.call_count(), 4);
}

#[tokio::test]
async fn test_schema_stays_with_first_page() {
    let mock = Arc::new(MockWarehouse::new(rows(4)));
    let executor = QueryExecutor::new(mock, None);
    let paginator = Paginator::new(&executor, "SELECT * FROM t", PageLimits::new(Some(2), None));

    let result = paginator.run(&ctx()).await.unwrap();
    assert_eq!(result.schema, vec!["id", "label"]);
    assert_eq!(result.pages_fetched, 3);
}

#[tokio::test]
async fn test_declared_columns_shape_every_row() {
    let mock = Arc::new(MockWarehouse::demo());
    let service = service(mock, &report_config("SELECT * FROM projects", 7));

    let result = service.fetch_all(&ctx()).await.unwrap();
    assert_eq!(result.rows.len(), 42);
    for row in &result.rows {
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, result.schema);
    }
}

#[tokio::test]
async fn test_failure_mid_loop_returns_no_rows() {
    let mock = Arc::new(MockWarehouse::new(rows(30)).failing_at_offset(20));
    let service = service(mock, &report_config("SELECT id FROM t", 10));

    let err = service.fetch_all(&ctx()).await.unwrap_err();
    assert!(matches!(err, ReportError::Query(_)));
    assert_eq!(
        err.to_string(),
        "Query error: paged query error: mock failure at offset 20"
    );
}

#[tokio::test]
async fn test_count_failure_isolated_from_paging() {
    let mock = Arc::new(MockWarehouse::new(rows(3)).failing_count());
    let service = service(mock, &report_config("SELECT id FROM t", 10));

    assert!(service.fetch_count(&ctx()).await.is_err());
    assert!(service.fetch_all(&ctx()).await.is_err());
    assert_eq!(service.fetch_raw(&ctx()).await.unwrap().count, 3);
}

#[tokio::test(start_paused = true)]
async fn test_slow_warehouse_times_out() {
    let mock = Arc::new(MockWarehouse::new(rows(3)).with_delay(Duration::from_secs(90)));
    let service = service(mock, &report_config("SELECT id FROM t", 10));
    let ctx = QueryContext::with_timeout(Duration::from_secs(60));

    let err = service.fetch_raw(&ctx).await.unwrap_err();
    assert!(matches!(err, ReportError::Timeout(_)));
    assert!(err.is_interrupted());
}
