//! BigQuery integration tests.
//!
//! Live tests need BQ_TEST_PROJECT plus credentials the client can find
//! (GOOGLE_APPLICATION_CREDENTIALS or ambient ADC). BQ_TEST_LOCATION is optional.

use std::time::Duration;

use bq_report::error::ReportError;
use bq_report::report::{PageLimits, Paginator, QueryExecutor};
use bq_report::warehouse::{self, ConnectionSettings, Credentials, QueryContext};

/// Helper to build settings from the environment.
fn get_test_settings() -> Option<ConnectionSettings> {
    let project = std::env::var("BQ_TEST_PROJECT").ok()?;
    let location = std::env::var("BQ_TEST_LOCATION").ok();
    let file = std::env::var("GOOGLE_APPLICATION_CREDENTIALS")
        .ok()
        .map(std::path::PathBuf::from);
    let credentials = Credentials::resolve(None, file.as_ref());
    ConnectionSettings::new(project, location, credentials).ok()
}

async fn get_test_executor() -> Option<QueryExecutor> {
    let settings = get_test_settings()?;
    let client = warehouse::connect(&settings).await.ok()?;
    Some(QueryExecutor::new(client, settings.location.clone()))
}

fn ctx() -> QueryContext {
    QueryContext::with_timeout(Duration::from_secs(120))
}

#[tokio::test]
async fn test_live_single_row() {
    let Some(executor) = get_test_executor().await else {
        eprintln!("Skipping test: BQ_TEST_PROJECT not set");
        return;
    };

    let paginator = Paginator::new(&executor, "SELECT 1 AS a", PageLimits::default());
    let result = paginator.run(&ctx()).await.unwrap();

    assert_eq!(result.schema, vec!["a"]);
    assert_eq!(
        serde_json::to_value(&result.rows).unwrap(),
        serde_json::json!([{"a": 1}])
    );
}

#[tokio::test]
async fn test_live_paging_across_pages() {
    let Some(executor) = get_test_executor().await else {
        eprintln!("Skipping test: BQ_TEST_PROJECT not set");
        return;
    };

    let sql = "SELECT n FROM UNNEST(GENERATE_ARRAY(1, 25)) AS n ORDER BY n";
    let paginator = Paginator::new(&executor, sql, PageLimits::new(Some(10), None));
    let result = paginator.run(&ctx()).await.unwrap();

    assert_eq!(result.rows.len(), 25);
    assert_eq!(result.pages_fetched, 4);
    assert_eq!(
        bq_report::report::fetch_count(&executor, sql, &ctx())
            .await
            .unwrap(),
        25
    );
}

#[tokio::test]
async fn test_live_typed_values() {
    let Some(executor) = get_test_executor().await else {
        eprintln!("Skipping test: BQ_TEST_PROJECT not set");
        return;
    };

    let sql = "SELECT 1.5 AS f, TRUE AS b, 'x' AS s, NULL AS z, \
               TIMESTAMP '2024-01-02 03:04:05 UTC' AS ts, [1, 2] AS arr, \
               STRUCT(1 AS x, 'y' AS y) AS rec";
    let paginator = Paginator::new(&executor, sql, PageLimits::default());
    let result = paginator.run(&ctx()).await.unwrap();

    assert_eq!(
        serde_json::to_value(&result.rows).unwrap(),
        serde_json::json!([{
            "f": 1.5,
            "b": true,
            "s": "x",
            "z": null,
            "ts": "2024-01-02T03:04:05Z",
            "arr": [1, 2],
            "rec": {"x": 1, "y": "y"}
        }])
    );
}

#[tokio::test]
async fn test_live_bad_sql_is_query_error() {
    let Some(executor) = get_test_executor().await else {
        eprintln!("Skipping test: BQ_TEST_PROJECT not set");
        return;
    };

    let err = executor.execute("SELEC 1", &ctx()).await.err().unwrap();
    assert!(matches!(err, ReportError::Query(_)), "got {err:?}");
}

#[tokio::test]
async fn test_connect_with_malformed_inline_key() {
    let settings = ConnectionSettings::new(
        "acme",
        None,
        Credentials::Inline("{not json".to_string()),
    )
    .unwrap();

    let err = warehouse::connect(&settings).await.err().unwrap();
    assert!(matches!(err, ReportError::Connection(_)));
    assert!(err.to_string().contains("bigquery client (json) error"));
}
