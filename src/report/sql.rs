//! SQL text helpers.
//!
//! The configured query is trusted and never parsed; these helpers only trim
//! it and wrap it in the paging and counting sub-queries.

use std::sync::OnceLock;

use regex::Regex;

/// Trims surrounding whitespace and a single trailing `;`.
pub fn clean_sql(sql: &str) -> &str {
    let trimmed = sql.trim();
    trimmed
        .strip_suffix(';')
        .map(str::trim_end)
        .unwrap_or(trimmed)
}

/// `SELECT * FROM (<query>) LIMIT <limit> OFFSET <offset>`
pub fn page_sql(base: &str, limit: u64, offset: u64) -> String {
    format!(
        "SELECT * FROM ({}) LIMIT {limit} OFFSET {offset}",
        clean_sql(base)
    )
}

/// `SELECT COUNT(*) AS total FROM (<query>)`
pub fn count_sql(base: &str) -> String {
    format!("SELECT COUNT(*) AS total FROM ({})", clean_sql(base))
}

/// Heuristic: does the query text mention an `ORDER BY` anywhere?
///
/// Used only to warn about offset paging over an unordered result.
pub fn has_order_by(sql: &str) -> bool {
    static ORDER_BY: OnceLock<Option<Regex>> = OnceLock::new();
    ORDER_BY
        .get_or_init(|| Regex::new(r"(?i)\border\s+by\b").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(sql))
}
