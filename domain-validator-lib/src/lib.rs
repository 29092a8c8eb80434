//! # Domain Validator Library
//!
//! A library for sorting large lists of web addresses into live sites and
//! parked "domain for sale" placeholders.
//!
//! Rows of a delimited table are probed concurrently in fixed-size batches.
//! Every fetched page is classified, and each row is written to the output,
//! dropped, or set aside for a single retry pass at a smaller batch size.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_validator_lib::{read_table_file, CsvSink, DomainValidator, ValidatorConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ValidatorConfig::new(2).with_retry(true);
//!     let table = read_table_file("sites.csv", b',', false)?;
//!     let sink = Arc::new(CsvSink::create("live.csv", b',')?);
//!
//!     let summary = DomainValidator::with_http(config, sink)?.run_table(table).await?;
//!     println!("{} requests failed", summary.stats.failed_requests);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Batched dispatch**: bounded concurrency with a per-batch deadline
//! - **Parked page detection**: case-insensitive marker matching
//! - **Retry pass**: failed rows are replayed once at a derived batch size
//! - **Pluggable I/O**: swap the HTTP transport or the output sink via traits

// Re-export main public API types and functions
pub use batch::{batches, Batches};
pub use classify::{is_domain_for_sale, PARKED_MARKERS};
pub use config::{
    load_env_config, parse_bool, parse_delimiter, parse_timeout_string, ConfigManager,
    DefaultsConfig, EnvConfig, FileConfig,
};
pub use dispatch::Dispatcher;
pub use error::DomainValidatorError;
pub use extract::{extract_urls, normalize_url, record_url, ExtractOptions, Extraction};
pub use retry::{derive_retry_batch_size, RetryController};
pub use router::{OutcomeRouter, Route};
pub use stats::{Counters, StatsSnapshot};
pub use table::{read_table, read_table_file, CsvSink, MemorySink, RowSink, Table};
pub use transport::{classify_error, HttpTransport, ResponseFuture, Transport};
pub use types::{
    BatchReport, FailureKind, Outcome, Pass, PassReport, Record, RequestFailure, RetryScope,
    RunSummary, UrlMap, ValidatorConfig,
};
pub use validator::DomainValidator;

// Internal modules - their public items are re-exported above
mod batch;
mod classify;
mod config;
mod dispatch;
mod error;
mod extract;
mod retry;
mod router;
mod stats;
mod table;
mod transport;
mod types;
mod validator;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DomainValidatorError>;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
