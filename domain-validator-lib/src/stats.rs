//! Run-wide counters.
//!
//! Every in-flight request may bump these from its own task, so each counter
//! is an independent atomic. Values only ever grow; they are read once at the
//! end of a run through [`Counters::snapshot`].

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared monotonic counters for one run.
#[derive(Debug, Default)]
pub struct Counters {
    failed_requests: AtomicU64,
    invalid_domains: AtomicU64,
    written: AtomicU64,
    retry_queued: AtomicU64,
    timeouts: AtomicU64,
    cancelled: AtomicU64,
    abandoned: AtomicU64,
    skipped_rows: AtomicU64,
    duplicate_urls: AtomicU64,
    write_errors: AtomicU64,
}

/// Point-in-time copy of [`Counters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Requests that ended in a network failure (both passes)
    pub failed_requests: u64,
    /// Pages classified as parked / for sale
    pub invalid_domains: u64,
    /// Rows appended to the output table, header excluded
    pub written: u64,
    /// Rows queued for the retry pass
    pub retry_queued: u64,
    /// Requests that hit the per-request timeout
    pub timeouts: u64,
    /// Requests that never completed
    pub cancelled: u64,
    /// Requests abandoned by a batch timeout
    pub abandoned: u64,
    /// Rows rejected by the URL extractor
    pub skipped_rows: u64,
    /// Rows whose URL collided with a later row in the same batch
    pub duplicate_urls: u64,
    /// Output writes that failed
    pub write_errors: u64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failed_request(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_domain(&self) {
        self.invalid_domains.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry_queued(&self) {
        self.retry_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self, count: usize) {
        self.abandoned.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_skipped_rows(&self, count: usize) {
        self.skipped_rows.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_duplicate_urls(&self, count: usize) {
        self.duplicate_urls.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    pub fn invalid_domains(&self) -> u64 {
        self.invalid_domains.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            invalid_domains: self.invalid_domains.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            retry_queued: self.retry_queued.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            skipped_rows: self.skipped_rows.load(Ordering::Relaxed),
            duplicate_urls: self.duplicate_urls.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_snapshot_reflects_increments() {
        let counters = Counters::new();
        counters.record_failed_request();
        counters.record_failed_request();
        counters.record_invalid_domain();
        counters.record_abandoned(3);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.failed_requests, 2);
        assert_eq!(snapshot.invalid_domains, 1);
        assert_eq!(snapshot.abandoned, 3);
        assert_eq!(snapshot.written, 0);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let counters = Arc::new(Counters::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counters.record_failed_request();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counters.failed_requests(), 8000);
    }
}
