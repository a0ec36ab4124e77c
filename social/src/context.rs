use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::errors::DbError;

/// Request-scoped deadline and cancellation flag.
///
/// Every statement of a multi-step protocol is started through [`RequestContext::run`]. Once the
/// deadline passes or the request is cancelled, the next statement fails and the remaining steps
/// are skipped. Steps that already completed are not rolled back.
#[derive(Clone, Default, Debug)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Default::default()
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels the request for every clone of this context.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Time left for a statement on `table`, or the error that stops the protocol.
    pub(crate) fn remaining(&self, table: &'static str) -> Result<Option<Duration>, DbError> {
        if self.is_cancelled() {
            return Err(DbError::Cancelled(table));
        }

        match self.deadline {
            Some(deadline) => {
                let now = Instant::now();

                if now >= deadline {
                    return Err(DbError::Timeout(table));
                }

                Ok(Some(deadline - now))
            }
            None => Ok(None),
        }
    }

    /// Runs one statement bounded by the remaining time. The closure receives that time so the
    /// store can forward it as the driver-side request timeout.
    pub(crate) async fn run<T, F, Fut>(&self, table: &'static str, statement: F) -> Result<T, DbError>
    where
        F: FnOnce(Option<Duration>) -> Fut,
        Fut: Future<Output = Result<T, DbError>>,
    {
        match self.remaining(table)? {
            Some(remaining) => tokio::time::timeout(remaining, statement(Some(remaining)))
                .await
                .map_err(|_| DbError::Timeout(table))?,
            None => statement(None).await,
        }
    }
}
