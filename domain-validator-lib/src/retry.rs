//! Retry pass control.
//!
//! A run makes at most two passes. The first covers the whole source; the
//! second replays whatever the router deferred, in smaller batches so a burst
//! of flaky hosts is spread over more, shorter barriers.

use crate::types::Pass;

/// Smallest batch the retry pass derives before clamping.
const RETRY_BATCH_FLOOR: usize = 5;

/// Retry batches smaller than this are rounded up to it.
const RETRY_BATCH_MIN: usize = 10;

/// Batch size for the retry pass, derived from the main batch size.
///
/// One tenth of the main size, but never below ten.
///
/// # Examples
///
/// ```
/// use domain_validator_lib::derive_retry_batch_size;
///
/// assert_eq!(derive_retry_batch_size(100), 10);
/// assert_eq!(derive_retry_batch_size(1000), 100);
/// assert_eq!(derive_retry_batch_size(40), 10);
/// ```
pub fn derive_retry_batch_size(batch_size: usize) -> usize {
    let derived = (batch_size / 10).max(RETRY_BATCH_FLOOR);
    if (RETRY_BATCH_FLOOR..RETRY_BATCH_MIN).contains(&derived) {
        RETRY_BATCH_MIN
    } else {
        derived
    }
}

/// Two-state machine deciding whether and how the retry pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryController {
    pass: Pass,
    enabled: bool,
    batch_size: usize,
}

impl RetryController {
    pub fn new(enabled: bool, batch_size: usize) -> Self {
        Self {
            pass: Pass::First,
            enabled,
            batch_size,
        }
    }

    /// Whether failures should be deferred in the current pass.
    pub fn accumulate(&self) -> bool {
        self.enabled && self.pass == Pass::First
    }

    pub fn pass(&self) -> Pass {
        self.pass
    }

    /// Leave the first pass.
    ///
    /// Returns the retry batch size the first time it is called with retries
    /// enabled. Every later call, and any call with retries disabled, returns
    /// `None`: the retry pass is terminal.
    pub fn advance(&mut self) -> Option<usize> {
        if !self.enabled || self.pass == Pass::Retry {
            return None;
        }
        self.pass = Pass::Retry;
        Some(derive_retry_batch_size(self.batch_size))
    }
}
