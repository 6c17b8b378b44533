//! Mock warehouse clients for testing.
//!
//! Provides an in-memory warehouse that understands the paged and count
//! wrappers the report engine issues, and a client that always fails.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Record, ResultRow, RowCursor, Statement, Value, WarehouseClient};
use crate::error::{ReportError, Result};

const PAGE_PREFIX: &str = "SELECT * FROM (";
const COUNT_PREFIX: &str = "SELECT COUNT(*) AS total FROM (";

/// A mock warehouse that serves a fixed dataset.
///
/// Any statement that is not a paged or count wrapper returns the whole dataset.
pub struct MockWarehouse {
    rows: Vec<ResultRow>,
    columns: Option<Vec<String>>,
    count_value: Option<Value>,
    fail_on_call: Option<usize>,
    fail_at_offset: Option<usize>,
    fail_count: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    statements: Mutex<Vec<Statement>>,
}

impl MockWarehouse {
    /// Creates a mock that returns keyed records with no column metadata.
    pub fn new(rows: Vec<ResultRow>) -> Self {
        Self {
            rows,
            columns: None,
            count_value: None,
            fail_on_call: None,
            fail_at_offset: None,
            fail_count: false,
            delay: None,
            calls: AtomicUsize::new(0),
            statements: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock with no rows.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Exposes column metadata and returns positional records in that order.
    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Makes the n-th statement (1-based) fail with a query error.
    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Makes the paged statement at `offset` fail, whatever order statements arrive in.
    pub fn failing_at_offset(mut self, offset: usize) -> Self {
        self.fail_at_offset = Some(offset);
        self
    }

    /// Makes every count statement fail.
    pub fn failing_count(mut self) -> Self {
        self.fail_count = true;
        self
    }

    /// Overrides the value returned in the `total` column of count statements.
    pub fn with_count_value(mut self, value: impl Into<Value>) -> Self {
        self.count_value = Some(value.into());
        self
    }

    /// Delays every statement, to exercise deadlines.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns every statement received so far, in order.
    pub fn statements(&self) -> Vec<Statement> {
        self.statements
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Number of statements received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A small project-tracking dataset used by `--mock-warehouse`.
    pub fn demo() -> Self {
        const CUSTOMERS: [&str; 5] = ["Acme", "Globex", "Initech", "Umbrella", "Hooli"];
        const STATUSES: [&str; 3] = ["on_track", "at_risk", "done"];

        let rows = (1..=42i64)
            .map(|id| {
                let mut row = ResultRow::new();
                row.insert("project_id".to_string(), Value::Int(id));
                row.insert(
                    "customer".to_string(),
                    Value::from(CUSTOMERS[(id as usize) % CUSTOMERS.len()]),
                );
                row.insert(
                    "status".to_string(),
                    Value::from(STATUSES[(id as usize) % STATUSES.len()]),
                );
                row.insert("progress".to_string(), Value::Float((id % 10) as f64 / 10.0));
                row.insert(
                    "tasks_open".to_string(),
                    if id % 7 == 0 { Value::Null } else { Value::Int(id % 13) },
                );
                row
            })
            .collect();

        Self::new(rows).with_columns(["project_id", "customer", "status", "progress", "tasks_open"])
    }

    fn record(&self, row: &ResultRow) -> Record {
        match &self.columns {
            Some(columns) => Record::Positional(
                columns
                    .iter()
                    .map(|c| row.get(c).cloned().unwrap_or_default())
                    .collect(),
            ),
            None => Record::Keyed(row.clone()),
        }
    }

    fn count_cursor(&self) -> Result<MockCursor> {
        if self.fail_count {
            return Err(ReportError::query("mock count failure"));
        }
        let total = self
            .count_value
            .clone()
            .unwrap_or(Value::Int(self.rows.len() as i64));
        let mut row = ResultRow::new();
        row.insert("total".to_string(), total);
        Ok(MockCursor {
            columns: None,
            records: VecDeque::from([Record::Keyed(row)]),
        })
    }
}

#[async_trait]
impl WarehouseClient for MockWarehouse {
    async fn query(&self, statement: Statement) -> Result<Box<dyn RowCursor>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut log) = self.statements.lock() {
            log.push(statement.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on_call == Some(call) {
            return Err(ReportError::query(format!("mock failure on call {call}")));
        }

        let sql = statement.sql.as_str();
        if sql.starts_with(COUNT_PREFIX) {
            return Ok(Box::new(self.count_cursor()?));
        }

        let selected: &[ResultRow] = match parse_page(sql) {
            Some((_, offset)) if self.fail_at_offset == Some(offset) => {
                return Err(ReportError::query(format!(
                    "mock failure at offset {offset}"
                )));
            }
            Some((limit, offset)) => {
                let start = offset.min(self.rows.len());
                let end = start.saturating_add(limit).min(self.rows.len());
                &self.rows[start..end]
            }
            None => &self.rows,
        };

        Ok(Box::new(MockCursor {
            columns: self.columns.clone(),
            records: selected.iter().map(|row| self.record(row)).collect(),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Extracts `(limit, offset)` from `SELECT * FROM (<q>) LIMIT n OFFSET m`.
fn parse_page(sql: &str) -> Option<(usize, usize)> {
    if !sql.starts_with(PAGE_PREFIX) {
        return None;
    }
    let (_, tail) = sql.rsplit_once(") LIMIT ")?;
    let (limit, offset) = tail.split_once(" OFFSET ")?;
    Some((limit.trim().parse().ok()?, offset.trim().parse().ok()?))
}

struct MockCursor {
    columns: Option<Vec<String>>,
    records: VecDeque<Record>,
}

#[async_trait]
impl RowCursor for MockCursor {
    fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    async fn next_record(&mut self) -> Result<Option<Record>> {
        Ok(self.records.pop_front())
    }
}

/// A warehouse client whose every statement fails.
pub struct FailingWarehouse {
    message: String,
}

impl FailingWarehouse {
    /// Creates a client that fails with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl WarehouseClient for FailingWarehouse {
    async fn query(&self, _statement: Statement) -> Result<Box<dyn RowCursor>> {
        Err(ReportError::query(self.message.clone()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}
