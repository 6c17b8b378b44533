//! Shared application state for the HTTP handlers.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::RequestTimeouts;
use crate::report::ReportService;
use crate::warehouse::QueryContext;

/// State shared by every request.
pub struct AppState {
    pub service: ReportService,
    pub timeouts: RequestTimeouts,
    /// Cancelled on SIGINT/SIGTERM; every request context is a child of it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        service: ReportService,
        timeouts: RequestTimeouts,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            service,
            timeouts,
            shutdown,
        }
    }

    /// Context for raw, single-page and count requests.
    pub fn short_context(&self) -> QueryContext {
        self.context(self.timeouts.raw)
    }

    /// Context for full materialization.
    pub fn long_context(&self) -> QueryContext {
        self.context(self.timeouts.full)
    }

    fn context(&self, budget: Duration) -> QueryContext {
        QueryContext::with_timeout(budget).with_cancel(self.shutdown.child_token())
    }
}
