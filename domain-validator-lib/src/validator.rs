//! Top-level run driver.
//!
//! `DomainValidator` owns one run: it walks the source in batches, hands each
//! batch's URL map to the dispatcher, flushes the output after every batch,
//! and replays deferred failures once when retries are enabled.

use crate::batch::Batches;
use crate::dispatch::Dispatcher;
use crate::error::DomainValidatorError;
use crate::extract::{extract_urls, ExtractOptions};
use crate::retry::RetryController;
use crate::router::OutcomeRouter;
use crate::stats::Counters;
use crate::table::{RowSink, Table};
use crate::transport::{HttpTransport, Transport};
use crate::types::{Pass, PassReport, Record, RunSummary, ValidatorConfig};
use std::sync::Arc;
use std::time::Instant;

/// Drives a validation run over a record sequence.
///
/// # Example
///
/// ```rust,no_run
/// use domain_validator_lib::{read_table_file, CsvSink, DomainValidator, ValidatorConfig};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ValidatorConfig::new(0).with_batch_size(50);
///     let table = read_table_file("sites.csv", config.delimiter, config.has_headers)?;
///     let sink = Arc::new(CsvSink::create("live.csv", config.delimiter)?);
///
///     let validator = DomainValidator::with_http(config, sink)?;
///     let summary = validator.run_table(table).await?;
///     println!("{} parked domains", summary.stats.invalid_domains);
///     Ok(())
/// }
/// ```
pub struct DomainValidator {
    /// Settings for this run
    config: ValidatorConfig,
    /// Batch dispatcher, which also owns the router and the sink
    dispatcher: Dispatcher,
    /// Counters shared with the router
    counters: Arc<Counters>,
}

impl DomainValidator {
    /// Create a validator over an arbitrary transport and sink.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration does not validate.
    pub fn new(
        config: ValidatorConfig,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn RowSink>,
    ) -> Result<Self, DomainValidatorError> {
        config.validate()?;

        let counters = Arc::new(Counters::new());
        let router = OutcomeRouter::new(
            sink,
            Arc::clone(&counters),
            config.include_failed,
            config.retry_scope,
        );
        let dispatcher = Dispatcher::new(transport, Arc::new(router), config.batch_timeout);

        Ok(Self {
            config,
            dispatcher,
            counters,
        })
    }

    /// Create a validator that probes over HTTP with the configured timeouts.
    pub fn with_http(
        config: ValidatorConfig,
        sink: Arc<dyn RowSink>,
    ) -> Result<Self, DomainValidatorError> {
        let transport = HttpTransport::from_config(&config)?;
        Self::new(config, Arc::new(transport), sink)
    }

    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }

    /// Run over a loaded table, copying its header row to the output first.
    ///
    /// # Errors
    ///
    /// Fails only if the header row cannot be written; everything after that
    /// is recovered per request.
    pub async fn run_table(&self, table: Table) -> Result<RunSummary, DomainValidatorError> {
        if let Some(header) = &table.header {
            let sink = self.dispatcher.router().sink();
            sink.write_record(header)?;
            sink.flush()?;
        }
        self.run(table.records).await
    }

    /// Run both passes over `records`.
    ///
    /// # Arguments
    ///
    /// * `records` - Data rows in source order, header excluded
    ///
    /// # Returns
    ///
    /// Per-pass reports and a snapshot of the run counters.
    pub async fn run(&self, records: Vec<Record>) -> Result<RunSummary, DomainValidatorError> {
        let started = Instant::now();
        let mut controller = RetryController::new(self.config.enable_retry, self.config.batch_size);

        let first_pass = self
            .run_pass(
                Pass::First,
                records,
                self.config.batch_size,
                controller.accumulate(),
            )
            .await?;

        let retry_pass = match controller.advance() {
            Some(retry_batch_size) => {
                let deferred = self.dispatcher.router().take_retry();
                if deferred.is_empty() {
                    tracing::info!("No failed requests to retry");
                }
                Some(
                    self.run_pass(
                        controller.pass(),
                        deferred,
                        retry_batch_size,
                        controller.accumulate(),
                    )
                    .await?,
                )
            }
            None => None,
        };

        let summary = RunSummary {
            first_pass,
            retry_pass,
            stats: self.counters.snapshot(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            failed_requests = summary.stats.failed_requests,
            invalid_domains = summary.stats.invalid_domains,
            written = summary.stats.written,
            elapsed_ms = summary.elapsed_ms,
            "Run complete"
        );

        Ok(summary)
    }

    async fn run_pass(
        &self,
        pass: Pass,
        records: Vec<Record>,
        batch_size: usize,
        accumulate: bool,
    ) -> Result<PassReport, DomainValidatorError> {
        let started = Instant::now();
        let mut report = PassReport::new(pass, batch_size, records.len());
        let total_batches = records.len().div_ceil(batch_size);
        let options = ExtractOptions {
            url_index: self.config.url_index,
            min_row_width: self.config.min_row_width,
        };

        tracing::info!(
            %pass,
            records = records.len(),
            batch_size,
            batches = total_batches,
            "Starting pass"
        );

        for (index, batch) in Batches::new(records, batch_size)?.enumerate() {
            let batch_started = Instant::now();

            let extraction = extract_urls(batch, &options);
            self.counters.record_skipped_rows(extraction.skipped);
            self.counters.record_duplicate_urls(extraction.duplicates);

            let batch_report = self.dispatcher.dispatch(extraction.urls, accumulate).await;
            report.absorb(&batch_report);

            if let Err(e) = self.dispatcher.router().sink().flush() {
                tracing::warn!(error = %e, "Failed to flush output after batch");
            }

            tracing::info!(
                %pass,
                batch = index + 1,
                of = total_batches,
                dispatched = batch_report.dispatched,
                abandoned = batch_report.abandoned,
                elapsed_ms = batch_started.elapsed().as_millis() as u64,
                "Batch finished"
            );
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(report)
    }
}
