//! Count estimation for the configured query.

use tracing::debug;

use crate::error::{ReportError, Result};
use crate::report::executor::QueryExecutor;
use crate::report::normalizer::scan_all;
use crate::report::sql::count_sql;
use crate::warehouse::{QueryContext, Value};

/// Runs `SELECT COUNT(*) AS total FROM (<base>)` and returns the total.
///
/// Integer and float encodings are both accepted; floats are truncated.
pub async fn fetch_count(executor: &QueryExecutor, base: &str, ctx: &QueryContext) -> Result<i64> {
    let sql = count_sql(base);
    debug!("FetchCount SQL: {}", sql);

    let mut cursor = executor
        .execute(&sql, ctx)
        .await
        .map_err(|e| e.context("count read error"))?;
    let scanned = scan_all(cursor.as_mut(), ctx)
        .await
        .map_err(|e| e.context("count iter error"))?;

    let row = scanned
        .rows
        .into_iter()
        .next()
        .ok_or_else(|| ReportError::decode("count iter error: count query returned no rows"))?;

    match row.get("total") {
        Some(Value::Int(n)) => Ok(*n),
        Some(Value::Float(f)) if f.is_finite() => Ok(*f as i64),
        Some(other) => Err(ReportError::decode(format!(
            "unexpected count type {}",
            other.kind()
        ))),
        None => Err(ReportError::decode("count column missing")),
    }
}
