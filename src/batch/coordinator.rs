//! Batch coordinator - fans a lazy path stream out to the executor
//!
//! Paths are dispatched as they arrive from the body parser, one tokio task
//! each. By default fan-out is unbounded. With a concurrency limit, dispatch
//! waits for a semaphore permit, which in turn stops pulling from the body
//! and applies backpressure to the client.
//!
//! The batch is done when the path stream has ended and every dispatched
//! task has returned. A parse error stops dispatching but still waits for the
//! tasks already running; their side effects (deletes) cannot be undone.

use crate::batch::executor::OperationExecutor;
use crate::batch::parser::PathToken;
use crate::batch::types::{BatchResult, ItemResult, Operation};
use crate::error::{FsError, ParseError};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Counters for a finished batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Highest number of items executing at the same time
    pub peak_in_flight: usize,
    pub duration: Duration,
}

/// Live count of executing items for one batch
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Drives one batch from path stream to collected results
#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    executor: OperationExecutor,
    max_concurrency: Option<usize>,
}

impl BatchCoordinator {
    /// Create a coordinator; `None` means one task per path with no limit
    pub fn new(executor: OperationExecutor, max_concurrency: Option<usize>) -> Self {
        Self {
            executor,
            max_concurrency,
        }
    }

    /// Per-batch in-flight limit
    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    /// Run `op` over every path in `tokens`
    ///
    /// Returns exactly one result per path in completion order, or the parse
    /// error that ended the stream once all dispatched work has finished.
    pub async fn run<S>(&self, tokens: S, op: Operation) -> Result<BatchResult, ParseError>
    where
        S: Stream<Item = Result<PathToken, ParseError>>,
    {
        self.run_with_summary(tokens, op)
            .await
            .map(|(results, _)| results)
    }

    /// Like [`run`](Self::run), also returning the batch counters
    pub async fn run_with_summary<S>(
        &self,
        tokens: S,
        op: Operation,
    ) -> Result<(BatchResult, BatchSummary), ParseError>
    where
        S: Stream<Item = Result<PathToken, ParseError>>,
    {
        let start = Instant::now();
        let limiter = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));
        let gauge = Arc::new(InFlight::default());

        let mut tokens = std::pin::pin!(tokens);
        let mut in_flight: FuturesUnordered<BoxFuture<'static, ItemResult>> = FuturesUnordered::new();
        let mut results: BatchResult = Vec::new();
        let mut dispatched: u64 = 0;
        let mut source_done = false;
        let mut fatal: Option<ParseError> = None;

        debug!(op = op.name(), limit = ?self.max_concurrency, "Starting batch");

        loop {
            tokio::select! {
                Some(item) = in_flight.next(), if !in_flight.is_empty() => {
                    results.push(item);
                }
                next = tokens.next(), if !source_done => match next {
                    Some(Ok(path)) => {
                        let permit = match &limiter {
                            Some(sem) => Arc::clone(sem).acquire_owned().await.ok(),
                            None => None,
                        };
                        in_flight.push(self.dispatch(path, op, permit, Arc::clone(&gauge)));
                        dispatched += 1;
                    }
                    Some(Err(err)) => {
                        fatal = Some(err);
                        source_done = true;
                    }
                    None => source_done = true,
                },
                else => break,
            }
        }

        debug_assert_eq!(results.len() as u64, dispatched);

        let succeeded = results.iter().filter(|r| r.is_success()).count() as u64;
        let summary = BatchSummary {
            dispatched,
            succeeded,
            failed: dispatched - succeeded,
            peak_in_flight: gauge.peak.load(Ordering::SeqCst),
            duration: start.elapsed(),
        };

        if let Some(err) = fatal {
            warn!(
                op = op.name(),
                dispatched = summary.dispatched,
                error = %err,
                "Batch rejected after dispatched items finished"
            );
            return Err(err);
        }

        info!(
            op = op.name(),
            items = summary.dispatched,
            succeeded = summary.succeeded,
            failed = summary.failed,
            peak_in_flight = summary.peak_in_flight,
            ms = summary.duration.as_millis() as u64,
            "Batch completed"
        );

        Ok((results, summary))
    }

    fn dispatch(
        &self,
        path: PathToken,
        op: Operation,
        permit: Option<tokio::sync::OwnedSemaphorePermit>,
        gauge: Arc<InFlight>,
    ) -> BoxFuture<'static, ItemResult> {
        let executor = self.executor.clone();
        let task_path = path.clone();

        let handle = tokio::spawn(async move {
            gauge.enter();
            let result = executor.execute(task_path, op).await;
            gauge.leave();
            drop(permit);
            result
        });

        // The executor never fails; a join error means the task was cancelled
        // or the runtime is going down, which still has to yield a result.
        async move {
            handle.await.unwrap_or_else(|e| {
                warn!(path = %path, error = %e, "Item task did not complete");
                let err = FsError::internal(op.name(), &path, e.to_string());
                ItemResult::failure(path, err)
            })
        }
        .boxed()
    }
}
