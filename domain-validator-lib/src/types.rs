//! Core data types for domain validation runs.
//!
//! This module defines the records flowing through the pipeline, the
//! per-request outcome model, the run configuration and the reports a run
//! produces.

use crate::error::DomainValidatorError;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// One row of the source table.
///
/// Identity is the row's position in the original source. Records are never
/// mutated after loading; routing moves them into the output sink or the
/// retry accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    position: usize,
    fields: Vec<String>,
}

impl Record {
    /// Create a record at `position` with the given fields.
    pub fn new(position: usize, fields: Vec<String>) -> Self {
        Self { position, fields }
    }

    /// Zero-based position of this row in the source table.
    pub fn position(&self) -> usize {
        self.position
    }

    /// All fields of the row, in order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// The field at `index`, if the row is wide enough.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Number of fields in the row.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Normalized URL -> originating record, built fresh for every batch.
pub type UrlMap = HashMap<String, Record>;

/// Why a request failed to produce a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// DNS resolution failed
    HostUnresolvable,
    /// Connect or read timeout at the transport level
    TimedOut,
    /// Connection refused, reset, TLS failure and similar
    ConnectionFailed,
    /// The request was cancelled before it completed
    Cancelled,
    /// The request could not be issued at all (e.g. unparseable URL)
    Submission,
    /// Anything the transport could not categorize
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::HostUnresolvable => write!(f, "host unresolvable"),
            FailureKind::TimedOut => write!(f, "timed out"),
            FailureKind::ConnectionFailed => write!(f, "connection failed"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Submission => write!(f, "submission failed"),
            FailureKind::Other => write!(f, "request failed"),
        }
    }
}

/// A failed request as reported by a [`crate::Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl RequestFailure {
    pub fn new<M: Into<String>>(kind: FailureKind, message: M) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// The resolved result of one dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A body was fetched and classified. `keep` is false for parked pages.
    Classified { keep: bool },
    /// The request failed at the network level
    NetworkFailure(FailureKind),
    /// The transport gave up waiting for the response
    Timeout,
    /// The request never completed
    Cancelled,
}

impl Outcome {
    /// Map a transport failure onto the outcome model.
    pub fn from_failure(kind: FailureKind) -> Self {
        match kind {
            FailureKind::TimedOut => Outcome::Timeout,
            FailureKind::Cancelled => Outcome::Cancelled,
            other => Outcome::NetworkFailure(other),
        }
    }
}

/// Which first-pass failures are queued for the retry pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryScope {
    /// Only requests whose host could not be resolved
    UnknownHost,
    /// Every network failure
    #[default]
    Network,
    /// Network failures plus request timeouts and cancellations
    All,
}

impl RetryScope {
    /// Whether a network failure of `kind` is retried under this scope.
    pub fn covers_failure(&self, kind: FailureKind) -> bool {
        match self {
            RetryScope::UnknownHost => kind == FailureKind::HostUnresolvable,
            RetryScope::Network | RetryScope::All => true,
        }
    }

    /// Whether timeouts and cancellations are retried under this scope.
    pub fn covers_unresolved(&self) -> bool {
        matches!(self, RetryScope::All)
    }
}

impl FromStr for RetryScope {
    type Err = DomainValidatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unknown-host" | "unknown_host" | "dns" => Ok(RetryScope::UnknownHost),
            "network" => Ok(RetryScope::Network),
            "all" => Ok(RetryScope::All),
            other => Err(DomainValidatorError::config(format!(
                "Unknown retry scope '{}'. Use one of: unknown-host, network, all",
                other
            ))),
        }
    }
}

impl fmt::Display for RetryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryScope::UnknownHost => write!(f, "unknown-host"),
            RetryScope::Network => write!(f, "network"),
            RetryScope::All => write!(f, "all"),
        }
    }
}

/// Configuration for a validation run.
///
/// Build it from [`ValidatorConfig::new`] and the `with_*` methods, then call
/// [`ValidatorConfig::validate`] before starting a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorConfig {
    /// Zero-based index of the field holding the URL
    pub url_index: usize,

    /// Rows with fewer fields are skipped. `None` disables the check.
    pub min_row_width: Option<usize>,

    /// Number of concurrent requests per batch
    /// Default: 100
    pub batch_size: usize,

    /// Write failed and parked rows to the output as well
    /// Default: true
    pub include_failed: bool,

    /// How long to wait for a whole batch before abandoning stragglers
    /// Default: 60 seconds
    pub batch_timeout: Duration,

    /// Replay first-pass failures once at a smaller batch size
    /// Default: false
    pub enable_retry: bool,

    /// Which failures the retry pass replays
    /// Default: every network failure
    pub retry_scope: RetryScope,

    /// Per-request timeout (connect plus read)
    /// Default: 50 seconds
    pub request_timeout: Duration,

    /// Per-request connect timeout
    /// Default: 20 seconds
    pub connect_timeout: Duration,

    /// Treat the first row as a header: copy it to the output, never probe it
    /// Default: false
    pub has_headers: bool,

    /// Field delimiter of the source and destination tables
    /// Default: b','
    pub delimiter: u8,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            url_index: 0,
            min_row_width: None,
            batch_size: 100,
            include_failed: true,
            batch_timeout: Duration::from_secs(60),
            enable_retry: false,
            retry_scope: RetryScope::default(),
            request_timeout: Duration::from_secs(50),
            connect_timeout: Duration::from_secs(20),
            has_headers: false,
            delimiter: b',',
        }
    }
}

impl ValidatorConfig {
    /// Create a configuration reading URLs from field `url_index`.
    pub fn new(url_index: usize) -> Self {
        Self {
            url_index,
            ..Self::default()
        }
    }

    pub fn with_min_row_width(mut self, width: Option<usize>) -> Self {
        self.min_row_width = width;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_include_failed(mut self, include: bool) -> Self {
        self.include_failed = include;
        self
    }

    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, enabled: bool) -> Self {
        self.enable_retry = enabled;
        self
    }

    pub fn with_retry_scope(mut self, scope: RetryScope) -> Self {
        self.retry_scope = scope;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Check the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<(), DomainValidatorError> {
        if self.batch_size == 0 {
            return Err(DomainValidatorError::config(
                "Batch size must be at least 1",
            ));
        }
        if self.batch_timeout.is_zero() {
            return Err(DomainValidatorError::config(
                "Batch timeout must be greater than zero",
            ));
        }
        if self.request_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(DomainValidatorError::config(
                "Request and connect timeouts must be greater than zero",
            ));
        }
        if let Some(0) = self.min_row_width {
            return Err(DomainValidatorError::config(
                "Minimum row width must be at least 1 when set",
            ));
        }
        Ok(())
    }
}

/// The two passes of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    First,
    Retry,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::First => write!(f, "first pass"),
            Pass::Retry => write!(f, "retry pass"),
        }
    }
}

/// What one dispatched batch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Requests issued (URL map size)
    pub dispatched: usize,
    /// Requests that resolved before the batch timeout
    pub completed: usize,
    /// Requests abandoned when the batch timeout fired
    pub abandoned: usize,
    /// Whether the batch timeout fired
    pub timed_out: bool,
}

/// Aggregate figures for one pass over a record sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub pass: Pass,
    pub batch_size: usize,
    pub records: usize,
    pub batches: usize,
    pub dispatched: usize,
    pub abandoned: usize,
    pub timed_out_batches: usize,
    pub elapsed_ms: u64,
}

impl PassReport {
    pub(crate) fn new(pass: Pass, batch_size: usize, records: usize) -> Self {
        Self {
            pass,
            batch_size,
            records,
            batches: 0,
            dispatched: 0,
            abandoned: 0,
            timed_out_batches: 0,
            elapsed_ms: 0,
        }
    }

    pub(crate) fn absorb(&mut self, batch: &BatchReport) {
        self.batches += 1;
        self.dispatched += batch.dispatched;
        self.abandoned += batch.abandoned;
        if batch.timed_out {
            self.timed_out_batches += 1;
        }
    }
}

/// Result of a complete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub first_pass: PassReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_pass: Option<PassReport>,
    pub stats: crate::stats::StatsSnapshot,
    pub elapsed_ms: u64,
}
