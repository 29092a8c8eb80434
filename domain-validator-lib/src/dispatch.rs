//! Concurrent dispatch of one batch.
//!
//! Every URL of a batch gets its own tokio task. The task awaits the
//! transport, classifies the result and hands it to the [`OutcomeRouter`].
//! The control flow waits on a countdown latch until every task has reported
//! or the batch timeout fires. Tasks still running at that point are left
//! alone, but their outcomes are dropped once they arrive.
//!
//! A task claims its slot under the batch gate before routing. Closing the
//! gate waits for claimed tasks to finish routing, so a request is either
//! routed within its batch or abandoned, never both.

use crate::classify::is_domain_for_sale;
use crate::router::OutcomeRouter;
use crate::transport::{ResponseFuture, Transport};
use crate::types::{BatchReport, Outcome, UrlMap};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};

/// Countdown shared by the control flow and the request tasks of one batch.
struct BatchLatch {
    remaining: AtomicUsize,
    notify: Notify,
    /// Held shared while routing; `true` once the batch is closed.
    gate: RwLock<bool>,
    claimed: AtomicUsize,
}

impl BatchLatch {
    fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
            notify: Notify::new(),
            gate: RwLock::new(false),
            claimed: AtomicUsize::new(0),
        }
    }

    fn count_down(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Stores a permit if the waiter has not parked yet.
            self.notify.notify_one();
        }
    }

    fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    async fn wait(&self) {
        while self.remaining() > 0 {
            self.notify.notified().await;
        }
    }

    /// Route an outcome unless the batch is already closed.
    ///
    /// Returns `false` when the outcome was dropped.
    async fn route_if_open<F: FnOnce()>(&self, route: F) -> bool {
        let closed = self.gate.read().await;
        if *closed {
            return false;
        }
        self.claimed.fetch_add(1, Ordering::AcqRel);
        route();
        true
    }

    /// Stop accepting outcomes and report how many requests never claimed
    /// their slot.
    ///
    /// Waits for tasks that are routing right now to finish.
    async fn close(&self, dispatched: usize) -> usize {
        let mut closed = self.gate.write().await;
        *closed = true;
        dispatched - self.claimed.load(Ordering::Acquire)
    }
}

/// Counts one request down when dropped, including on panic unwind.
struct LatchGuard(Arc<BatchLatch>);

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.0.count_down();
    }
}

/// Issues the requests of a batch and waits for them under a deadline.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    router: Arc<OutcomeRouter>,
    batch_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        router: Arc<OutcomeRouter>,
        batch_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            router,
            batch_timeout,
        }
    }

    pub fn router(&self) -> &Arc<OutcomeRouter> {
        &self.router
    }

    /// Probe every URL of `urls` concurrently and route each outcome.
    ///
    /// Returns once all requests have been routed or the batch timeout has
    /// elapsed, whichever comes first. With `accumulate` set, failures within
    /// the router's retry scope are queued for a retry pass.
    pub async fn dispatch(&self, urls: UrlMap, accumulate: bool) -> BatchReport {
        let dispatched = urls.len();
        let latch = Arc::new(BatchLatch::new(dispatched));

        for (url, record) in urls {
            let guard = LatchGuard(Arc::clone(&latch));

            match self.transport.submit(&url) {
                Ok(response) => {
                    let router = Arc::clone(&self.router);
                    let latch = Arc::clone(&latch);
                    tokio::spawn(async move {
                        let _guard = guard;
                        let outcome = resolve(&url, response).await;
                        let routed = latch
                            .route_if_open(|| {
                                router.route(&url, record, outcome, accumulate);
                            })
                            .await;
                        if !routed {
                            tracing::debug!(url = %url, ?outcome, "Outcome arrived after batch timeout, ignored");
                        }
                    });
                }
                Err(failure) => {
                    let _guard = guard;
                    tracing::warn!(url = %url, error = %failure, "Request could not be submitted");
                    // The gate cannot be closed before every request is submitted.
                    latch.claimed.fetch_add(1, Ordering::AcqRel);
                    self.router
                        .route(&url, record, Outcome::NetworkFailure(failure.kind), accumulate);
                }
            }
        }

        let finished = tokio::time::timeout(self.batch_timeout, latch.wait())
            .await
            .is_ok();
        let abandoned = latch.close(dispatched).await;

        if abandoned > 0 {
            self.router.counters().record_abandoned(abandoned);
            tracing::warn!(
                abandoned,
                timeout = ?self.batch_timeout,
                "Batch timed out, abandoning outstanding requests"
            );
        }

        BatchReport {
            dispatched,
            completed: dispatched - abandoned,
            abandoned,
            timed_out: !finished,
        }
    }
}

/// Await a response and turn it into an outcome.
///
/// A transport future that panics never produced a result, so it counts as
/// cancelled.
async fn resolve(url: &str, response: ResponseFuture) -> Outcome {
    match AssertUnwindSafe(response).catch_unwind().await {
        Ok(Ok(body)) => Outcome::Classified {
            keep: !is_domain_for_sale(&body),
        },
        Ok(Err(failure)) => {
            tracing::debug!(url, error = %failure, "Request failed");
            Outcome::from_failure(failure.kind)
        }
        Err(_) => {
            tracing::warn!(url, "Request task panicked, treating as cancelled");
            Outcome::Cancelled
        }
    }
}
