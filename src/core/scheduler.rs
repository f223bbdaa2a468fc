use std::future::Future;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, warn};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Fans a task list out to at most `limit` concurrent workers and fans the
/// outcomes back in, order-independent. `work` is infallible by contract:
/// it folds its own errors into the outcome value, so one bad task never
/// aborts its siblings.
pub struct BoundedScheduler {
    limit: usize,
}

impl BoundedScheduler {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Runs every task once and returns when all have resolved. Slot
    /// admission is FIFO. A cancelled token stops admitting pending tasks
    /// and abandons in-flight ones; their outcomes are simply absent, and
    /// callers detect cancellation through the token itself.
    pub async fn run<T, R, F, Fut>(
        &self,
        tasks: Vec<T>,
        cancel: CancellationToken,
        work: F,
    ) -> Vec<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let work = Arc::new(work);
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let mut in_flight = FuturesUnordered::new();

        for task in tasks {
            let work = Arc::clone(&work);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();

            in_flight.push(tokio::spawn(async move {
                // Cancellation wins every race: a cancelled batch admits
                // nothing and never polls abandoned work.
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return None,
                    permit = semaphore.acquire_owned() => permit,
                };
                // The semaphore is never closed while workers hold it.
                let _permit = permit.ok()?;

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    outcome = work(task) => Some(outcome),
                }
            }));
        }

        let mut outcomes = Vec::with_capacity(in_flight.len());
        while let Some(joined) = in_flight.next().await {
            match joined {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => debug!("Task abandoned by cancellation"),
                Err(e) => warn!("Task panicked: {}", e),
            }
        }
        outcomes
    }
}
