//! Request-scoped deadline and cancellation for warehouse calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ReportError, Result};

/// Deadline used when `now + budget` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Deadline plus cancellation token shared by every warehouse call of one request.
///
/// The deadline bounds the whole request, not each call: a pagination loop
/// that runs through ten pages spends the same budget as a single query.
#[derive(Debug, Clone)]
pub struct QueryContext {
    deadline: Instant,
    budget: Duration,
    cancel: CancellationToken,
}

impl QueryContext {
    /// Creates a context that expires `budget` from now.
    pub fn with_timeout(budget: Duration) -> Self {
        let now = Instant::now();
        Self {
            deadline: now.checked_add(budget).unwrap_or(now + FAR_FUTURE),
            budget,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the cancellation token, typically with a child of the server shutdown token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Time left before the deadline (zero once elapsed).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Returns the cancellation token for this request.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Runs `fut` unless the deadline elapses or the request is cancelled first.
    ///
    /// Deadline and cancellation surface as `Timeout` and `Cancelled`, never as
    /// `Query`, so callers can tell a slow warehouse from a bad statement.
    pub async fn run<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(ReportError::cancelled(format!("{operation} cancelled")));
        }

        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => {
                Err(ReportError::cancelled(format!("{operation} cancelled")))
            }
            outcome = tokio::time::timeout_at(self.deadline, fut) => match outcome {
                Ok(result) => result,
                Err(_) => Err(ReportError::timeout(format!(
                    "{operation} exceeded the {}s request deadline",
                    self.budget.as_secs()
                ))),
            },
        }
    }
}
