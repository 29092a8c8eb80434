//! Domain Validator CLI Application
//!
//! A command-line interface that copies a CSV of web addresses, dropping the
//! rows whose site turned out to be a parked "domain for sale" page.
//! This CLI application is a thin front end to the domain-validator-lib library.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use domain_validator_lib::{load_env_config, parse_delimiter, parse_timeout_string};
use domain_validator_lib::{read_table_file, CsvSink, DomainValidator, ValidatorConfig};
use domain_validator_lib::{ConfigManager, FileConfig, RetryScope};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for domain-validator
#[derive(Parser, Debug)]
#[command(name = "domain-validator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Filter parked \"domain for sale\" sites out of a CSV of URLs")]
#[command(
    long_about = "Fetch every URL listed in a CSV file, in concurrent batches, and write the rows whose page is not a parked \"domain for sale\" placeholder to a new CSV file.\n\nFailed requests can be kept or dropped, and optionally retried once at a smaller batch size."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Source CSV file
    #[arg(short = 's', long = "source", value_name = "FILE", help_heading = "Input/Output")]
    pub source: String,

    /// Destination CSV file (created or truncated)
    #[arg(short = 'd', long = "dest", value_name = "FILE", help_heading = "Input/Output")]
    pub dest: String,

    /// Zero-based index of the field holding the URL
    #[arg(short = 'i', long = "url-index", value_name = "N", help_heading = "Input/Output")]
    pub url_index: usize,

    /// Skip rows with fewer fields than this
    #[arg(
        short = 'v',
        long = "valid-row-width",
        value_name = "N",
        help_heading = "Input/Output"
    )]
    pub min_row_width: Option<usize>,

    /// Treat the first row as a header and copy it unchanged
    #[arg(long = "has-headers", help_heading = "Input/Output")]
    pub has_headers: bool,

    /// Treat the first row as data even if the config says otherwise
    #[arg(long = "no-headers", conflicts_with = "has_headers", help_heading = "Input/Output")]
    pub no_headers: bool,

    /// Field delimiter (single character, or "tab")
    #[arg(long = "delimiter", value_name = "CHAR", help_heading = "Input/Output")]
    pub delimiter: Option<String>,

    /// Keep rows whose request failed or whose page is parked (default: true)
    #[arg(
        short = 'f',
        long = "include-failed",
        value_name = "BOOL",
        help_heading = "Filtering"
    )]
    pub include_failed: Option<bool>,

    /// Requests sent concurrently per batch (default: 100)
    #[arg(short = 'b', long = "batch-size", value_name = "N", help_heading = "Performance")]
    pub batch_size: Option<usize>,

    /// Seconds to wait for a whole batch before moving on (default: 60)
    #[arg(
        short = 't',
        long = "batch-timeout",
        value_name = "SECS",
        help_heading = "Performance"
    )]
    pub batch_timeout: Option<u64>,

    /// Per-request timeout in seconds (default: 50)
    #[arg(long = "request-timeout", value_name = "SECS", help_heading = "Performance")]
    pub request_timeout: Option<u64>,

    /// Per-request connect timeout in seconds (default: 20)
    #[arg(long = "connect-timeout", value_name = "SECS", help_heading = "Performance")]
    pub connect_timeout: Option<u64>,

    /// Retry failed requests once after the first pass
    #[arg(short = 'r', long = "retry", help_heading = "Retry")]
    pub retry: bool,

    /// Skip the retry pass even if a config file or DV_RETRY enables it
    #[arg(long = "no-retry", conflicts_with = "retry", help_heading = "Retry")]
    pub no_retry: bool,

    /// Which failures to retry: unknown-host, network or all (default: network)
    #[arg(long = "retry-scope", value_name = "SCOPE", help_heading = "Retry")]
    pub retry_scope: Option<String>,

    /// Print the run summary as JSON
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show per-pass details in the summary
    #[arg(long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args);

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run_validation(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over the flags.
fn init_logging(args: &Args) {
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.source.trim().is_empty() || args.dest.trim().is_empty() {
        return Err("Both --source and --dest must name a file".to_string());
    }

    if args.source == args.dest {
        return Err("--dest must differ from --source".to_string());
    }

    if args.batch_size == Some(0) {
        return Err("Batch size must be at least 1".to_string());
    }

    if args.min_row_width == Some(0) {
        return Err("Valid row width must be at least 1".to_string());
    }

    for (flag, value) in [
        ("--batch-timeout", args.batch_timeout),
        ("--request-timeout", args.request_timeout),
        ("--connect-timeout", args.connect_timeout),
    ] {
        if value == Some(0) {
            return Err(format!("{} must be greater than zero", flag));
        }
    }

    if let Some(delimiter) = &args.delimiter {
        if parse_delimiter(delimiter).is_none() {
            return Err(format!(
                "Invalid delimiter '{}'. Use a single ASCII character",
                delimiter
            ));
        }
    }

    if let Some(scope) = &args.retry_scope {
        scope.parse::<RetryScope>().map_err(|e| e.to_string())?;
    }

    Ok(())
}

/// Load the input, open the output, run both passes and report.
///
/// Every fallible setup step happens before the first request is sent.
async fn run_validation(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    config.validate()?;

    let table = read_table_file(&args.source, config.delimiter, config.has_headers)?;
    let sink = CsvSink::create(&args.dest, config.delimiter)?;

    if !args.json {
        ui::print_header(&args, &config, table.records.len());
    }

    let validator = DomainValidator::with_http(config, Arc::new(sink))?;
    let summary = validator.run_table(table).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        ui::print_summary(&summary, &args);
    }

    Ok(())
}

/// Resolve the run configuration.
///
/// Precedence, highest first: CLI flags, `DV_*` environment variables,
/// the explicit config file (`--config`, then `DV_CONFIG`), discovered
/// config files, built-in defaults.
fn build_config(args: &Args) -> Result<ValidatorConfig, Box<dyn std::error::Error>> {
    let mut config = ValidatorConfig::new(args.url_index);

    let config_manager = ConfigManager::new(args.verbose);
    let env_config = load_env_config(args.verbose);

    // Step 1: config files
    let explicit_config_path = args.config.clone().or_else(|| env_config.config.clone());
    if let Some(path) = explicit_config_path {
        tracing::debug!(path = %path, "Using explicit config file");
        let file_config = config_manager
            .load_file(&path)
            .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?;
        config = merge_file_config(config, file_config)?;
    } else {
        tracing::debug!("Discovering config files");
        config = merge_file_config(config, config_manager.discover_and_load())?;
    }

    // Step 2: environment variables (DV_*)
    if let Some(batch_size) = env_config.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(timeout) = env_config.batch_timeout {
        config.batch_timeout = timeout;
    }
    if let Some(include_failed) = env_config.include_failed {
        config.include_failed = include_failed;
    }
    if let Some(retry) = env_config.retry {
        config.enable_retry = retry;
    }
    if let Some(scope) = env_config.retry_scope {
        config.retry_scope = scope;
    }
    if let Some(timeout) = env_config.request_timeout {
        config.request_timeout = timeout;
    }
    if let Some(timeout) = env_config.connect_timeout {
        config.connect_timeout = timeout;
    }

    // Step 3: CLI arguments (highest precedence)
    apply_cli_args_to_config(config, args)
}

/// Apply the `[defaults]` table of a config file.
fn merge_file_config(
    mut config: ValidatorConfig,
    file_config: FileConfig,
) -> Result<ValidatorConfig, Box<dyn std::error::Error>> {
    let Some(defaults) = file_config.defaults else {
        return Ok(config);
    };

    if let Some(batch_size) = defaults.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(include_failed) = defaults.include_failed {
        config.include_failed = include_failed;
    }
    if let Some(retry) = defaults.retry {
        config.enable_retry = retry;
    }
    if let Some(scope) = defaults.retry_scope {
        config.retry_scope = scope.parse()?;
    }
    if let Some(width) = defaults.min_row_width {
        config.min_row_width = Some(width);
    }
    if let Some(has_headers) = defaults.has_headers {
        config.has_headers = has_headers;
    }
    if let Some(delimiter) = defaults.delimiter {
        config.delimiter = parse_delimiter(&delimiter)
            .ok_or_else(|| format!("Invalid delimiter '{}' in config file", delimiter))?;
    }
    if let Some(timeout) = defaults.batch_timeout {
        config.batch_timeout = file_duration("batch_timeout", &timeout)?;
    }
    if let Some(timeout) = defaults.request_timeout {
        config.request_timeout = file_duration("request_timeout", &timeout)?;
    }
    if let Some(timeout) = defaults.connect_timeout {
        config.connect_timeout = file_duration("connect_timeout", &timeout)?;
    }

    Ok(config)
}

fn file_duration(key: &str, value: &str) -> Result<Duration, String> {
    parse_timeout_string(value)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("Invalid {} '{}' in config file", key, value))
}

/// Apply CLI arguments to config (highest precedence).
///
/// Only flags the user actually passed override lower layers.
fn apply_cli_args_to_config(
    mut config: ValidatorConfig,
    args: &Args,
) -> Result<ValidatorConfig, Box<dyn std::error::Error>> {
    config.url_index = args.url_index;

    if let Some(width) = args.min_row_width {
        config.min_row_width = Some(width);
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(include_failed) = args.include_failed {
        config.include_failed = include_failed;
    }
    if let Some(secs) = args.batch_timeout {
        config.batch_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.request_timeout {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.connect_timeout {
        config.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(scope) = &args.retry_scope {
        config.retry_scope = scope.parse()?;
    }
    if let Some(delimiter) = &args.delimiter {
        config.delimiter = parse_delimiter(delimiter)
            .ok_or_else(|| format!("Invalid delimiter '{}'", delimiter))?;
    }

    if args.retry {
        config.enable_retry = true;
    } else if args.no_retry {
        config.enable_retry = false;
    }
    if args.has_headers {
        config.has_headers = true;
    } else if args.no_headers {
        config.has_headers = false;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_validator_lib::DefaultsConfig;

    // Helper function with all required fields
    fn create_test_args() -> Args {
        Args {
            source: "in.csv".to_string(),
            dest: "out.csv".to_string(),
            url_index: 0,
            min_row_width: None,
            has_headers: false,
            no_headers: false,
            delimiter: None,
            include_failed: None,
            batch_size: None,
            batch_timeout: None,
            request_timeout: None,
            connect_timeout: None,
            retry: false,
            no_retry: false,
            retry_scope: None,
            json: false,
            config: None,
            debug: false,
            verbose: false,
        }
    }

    #[test]
    fn test_parse_original_short_flags() {
        let args = Args::try_parse_from([
            "domain-validator",
            "-s",
            "in.csv",
            "-d",
            "out.csv",
            "-i",
            "2",
            "-v",
            "4",
            "-b",
            "50",
            "-f",
            "false",
            "-t",
            "30",
            "-r",
        ])
        .unwrap();

        assert_eq!(args.url_index, 2);
        assert_eq!(args.min_row_width, Some(4));
        assert_eq!(args.batch_size, Some(50));
        assert_eq!(args.include_failed, Some(false));
        assert_eq!(args.batch_timeout, Some(30));
        assert!(args.retry);
    }

    #[test]
    fn test_url_index_is_required() {
        let result = Args::try_parse_from(["domain-validator", "-s", "in.csv", "-d", "out.csv"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_args() {
        assert!(validate_args(&create_test_args()).is_ok());

        let mut args = create_test_args();
        args.batch_size = Some(0);
        assert!(validate_args(&args).is_err());

        let mut args = create_test_args();
        args.dest = args.source.clone();
        assert!(validate_args(&args).is_err());

        let mut args = create_test_args();
        args.batch_timeout = Some(0);
        assert!(validate_args(&args).is_err());

        let mut args = create_test_args();
        args.retry_scope = Some("sometimes".to_string());
        assert!(validate_args(&args).is_err());

        let mut args = create_test_args();
        args.delimiter = Some(";;".to_string());
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_cli_args_override_lower_layers() {
        let base = ValidatorConfig::new(0)
            .with_batch_size(20)
            .with_include_failed(false)
            .with_retry(true);

        let mut args = create_test_args();
        args.url_index = 3;
        args.batch_size = Some(500);
        args.retry_scope = Some("all".to_string());
        args.delimiter = Some("tab".to_string());

        let config = apply_cli_args_to_config(base, &args).unwrap();
        assert_eq!(config.url_index, 3);
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.retry_scope, RetryScope::All);
        assert_eq!(config.delimiter, b'\t');
        // Untouched settings keep the lower layer's value.
        assert!(!config.include_failed);
        assert!(config.enable_retry);
    }

    #[test]
    fn test_negative_flags_override_lower_layers() {
        let base = ValidatorConfig::new(0).with_retry(true).with_headers(true);

        let mut args = create_test_args();
        args.no_retry = true;
        args.no_headers = true;

        let config = apply_cli_args_to_config(base.clone(), &args).unwrap();
        assert!(!config.enable_retry);
        assert!(!config.has_headers);

        // Without either flag the lower layer stands.
        let config = apply_cli_args_to_config(base, &create_test_args()).unwrap();
        assert!(config.enable_retry);
        assert!(config.has_headers);
    }

    #[test]
    fn test_retry_and_no_retry_conflict() {
        let result = Args::try_parse_from([
            "domain-validator",
            "-s",
            "in.csv",
            "-d",
            "out.csv",
            "-i",
            "0",
            "--retry",
            "--no-retry",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_file_config() {
        let file_config = FileConfig {
            defaults: Some(DefaultsConfig {
                batch_size: Some(40),
                batch_timeout: Some("2m".to_string()),
                retry: Some(true),
                retry_scope: Some("unknown-host".to_string()),
                delimiter: Some(";".to_string()),
                ..Default::default()
            }),
        };

        let config = merge_file_config(ValidatorConfig::new(1), file_config).unwrap();
        assert_eq!(config.batch_size, 40);
        assert_eq!(config.batch_timeout, Duration::from_secs(120));
        assert!(config.enable_retry);
        assert_eq!(config.retry_scope, RetryScope::UnknownHost);
        assert_eq!(config.delimiter, b';');
        assert!(config.include_failed);
    }

    #[test]
    fn test_merge_empty_file_config_keeps_defaults() {
        let config = merge_file_config(ValidatorConfig::new(0), FileConfig::default()).unwrap();
        assert_eq!(config, ValidatorConfig::new(0));
    }
}
