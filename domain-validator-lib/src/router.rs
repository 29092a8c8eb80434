//! Per-request routing policy.
//!
//! Every resolved request ends up here exactly once. The router decides
//! whether its record goes to the output table, into the retry accumulator,
//! or nowhere, and keeps the run counters up to date. It is shared by all
//! request tasks of a batch, so all of its state is safe for concurrent use.

use crate::stats::Counters;
use crate::table::RowSink;
use crate::types::{Outcome, Record, RetryScope};
use std::sync::{Arc, Mutex};

/// Where a routed record ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Written,
    Dropped,
    Deferred,
    WriteFailed,
}

/// Applies the output/retry policy to resolved requests.
pub struct OutcomeRouter {
    sink: Arc<dyn RowSink>,
    counters: Arc<Counters>,
    retry: Mutex<Vec<Record>>,
    include_failed: bool,
    retry_scope: RetryScope,
}

impl OutcomeRouter {
    pub fn new(
        sink: Arc<dyn RowSink>,
        counters: Arc<Counters>,
        include_failed: bool,
        retry_scope: RetryScope,
    ) -> Self {
        Self {
            sink,
            counters,
            retry: Mutex::new(Vec::new()),
            include_failed,
            retry_scope,
        }
    }

    /// Route one resolved request.
    ///
    /// With `accumulate` set, failures covered by the retry scope are queued
    /// for the retry pass instead of being written now; the retry pass routes
    /// them again with `accumulate` off.
    pub fn route(&self, url: &str, record: Record, outcome: Outcome, accumulate: bool) -> Route {
        match outcome {
            Outcome::Classified { keep: true } => self.write(url, &record),
            Outcome::Classified { keep: false } => {
                self.counters.record_invalid_domain();
                tracing::debug!(url, "Parked domain detected");
                self.write_if_included(url, &record)
            }
            Outcome::NetworkFailure(kind) => {
                self.counters.record_failed_request();
                tracing::debug!(url, %kind, "Request failed");
                if accumulate && self.retry_scope.covers_failure(kind) {
                    self.defer(record)
                } else {
                    self.write_if_included(url, &record)
                }
            }
            Outcome::Timeout | Outcome::Cancelled => {
                if outcome == Outcome::Timeout {
                    self.counters.record_timeout();
                } else {
                    self.counters.record_cancelled();
                }
                tracing::debug!(url, ?outcome, "Request unresolved, keeping row");
                if accumulate && self.retry_scope.covers_unresolved() {
                    self.defer(record)
                } else {
                    self.write(url, &record)
                }
            }
        }
    }

    /// Drain the retry accumulator, in the order records were queued.
    pub fn take_retry(&self) -> Vec<Record> {
        std::mem::take(&mut *self.retry.lock().unwrap_or_else(|p| p.into_inner()))
    }

    /// Number of records currently queued for retry.
    pub fn retry_len(&self) -> usize {
        self.retry.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }

    pub fn sink(&self) -> &Arc<dyn RowSink> {
        &self.sink
    }

    fn write_if_included(&self, url: &str, record: &Record) -> Route {
        if self.include_failed {
            self.write(url, record)
        } else {
            Route::Dropped
        }
    }

    fn write(&self, url: &str, record: &Record) -> Route {
        match self.sink.write_record(record) {
            Ok(()) => {
                self.counters.record_written();
                Route::Written
            }
            Err(e) => {
                self.counters.record_write_error();
                tracing::error!(url, row = record.position(), error = %e, "Failed to write row");
                Route::WriteFailed
            }
        }
    }

    fn defer(&self, record: Record) -> Route {
        self.counters.record_retry_queued();
        self.retry
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(record);
        Route::Deferred
    }
}
