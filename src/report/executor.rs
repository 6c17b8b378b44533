//! Query execution against the warehouse.
//!
//! Provides isolated statement execution with location pinning and
//! deadline handling that can be tested independently of the HTTP layer.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::report::sql::clean_sql;
use crate::warehouse::{QueryContext, RowCursor, Statement, WarehouseClient};

/// Runs single statements with the request's deadline and the configured location.
#[derive(Clone)]
pub struct QueryExecutor {
    client: Arc<dyn WarehouseClient>,
    location: Option<String>,
}

impl QueryExecutor {
    /// Creates a new query executor.
    pub fn new(client: Arc<dyn WarehouseClient>, location: Option<String>) -> Self {
        Self {
            client,
            location: location.filter(|l| !l.trim().is_empty()),
        }
    }

    /// Starts `sql` and returns a cursor over its rows.
    ///
    /// The SQL is trimmed of whitespace and one trailing `;`, nothing else.
    /// Deadline and cancellation come back as `Timeout` / `Cancelled`.
    pub async fn execute(&self, sql: &str, ctx: &QueryContext) -> Result<Box<dyn RowCursor>> {
        let sql = clean_sql(sql);
        debug!(backend = self.client.name(), "Running SQL:\n{}", sql);

        let statement = Statement::new(sql)
            .with_location(self.location.clone())
            .with_timeout(ctx.remaining());
        ctx.run("query", self.client.query(statement)).await
    }

    /// The configured data location, if any.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}
