//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and the
//! `DV_*` environment variables, and merging file configurations with
//! proper precedence rules. Command-line flags are layered on top by the
//! binary.

use crate::error::DomainValidatorError;
use crate::types::RetryScope;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Requests per batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// Batch timeout ("60s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_timeout: Option<String>,

    /// Write failed and parked rows too
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_failed: Option<bool>,

    /// Run the retry pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<bool>,

    /// "unknown-host", "network" or "all"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_scope: Option<String>,

    /// Per-request timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,

    /// Per-request connect timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<String>,

    /// Rows with fewer fields are skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_row_width: Option<usize>,

    /// First row is a header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_headers: Option<bool>,

    /// Single-character field delimiter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error if reading, parsing or
    /// validation fails.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, DomainValidatorError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DomainValidatorError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DomainValidatorError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// The XDG config is loaded first, then the one in the home directory,
    /// then the one in the current directory; later files override earlier
    /// ones key by key. Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> FileConfig {
        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        let mut merged_config = FileConfig::default();
        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    if self.verbose {
                        tracing::info!(path = %path.display(), "Loaded configuration file");
                    }
                    merged_config = self.merge_configs(merged_config, config);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring configuration file");
                }
            }
        }

        merged_config
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./domain-validator.toml", "./.domain-validator.toml"]
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Get the global configuration file path.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".domain-validator.toml", "domain-validator.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Get the XDG configuration file path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-validator").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower), Some(higher)) => Some(DefaultsConfig {
                    batch_size: higher.batch_size.or(lower.batch_size),
                    batch_timeout: higher.batch_timeout.or(lower.batch_timeout),
                    include_failed: higher.include_failed.or(lower.include_failed),
                    retry: higher.retry.or(lower.retry),
                    retry_scope: higher.retry_scope.or(lower.retry_scope),
                    request_timeout: higher.request_timeout.or(lower.request_timeout),
                    connect_timeout: higher.connect_timeout.or(lower.connect_timeout),
                    min_row_width: higher.min_row_width.or(lower.min_row_width),
                    has_headers: higher.has_headers.or(lower.has_headers),
                    delimiter: higher.delimiter.or(lower.delimiter),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), DomainValidatorError> {
        let Some(defaults) = &config.defaults else {
            return Ok(());
        };

        if defaults.batch_size == Some(0) {
            return Err(DomainValidatorError::config("batch_size must be at least 1"));
        }

        if defaults.min_row_width == Some(0) {
            return Err(DomainValidatorError::config("min_row_width must be at least 1"));
        }

        for (key, value) in [
            ("batch_timeout", &defaults.batch_timeout),
            ("request_timeout", &defaults.request_timeout),
            ("connect_timeout", &defaults.connect_timeout),
        ] {
            if let Some(value) = value {
                if parse_timeout_string(value).is_none() {
                    return Err(DomainValidatorError::config(format!(
                        "Invalid {} '{}'. Use format like '5s', '30s', '2m'",
                        key, value
                    )));
                }
            }
        }

        if let Some(scope) = &defaults.retry_scope {
            scope.parse::<RetryScope>()?;
        }

        if let Some(delimiter) = &defaults.delimiter {
            if parse_delimiter(delimiter).is_none() {
                return Err(DomainValidatorError::config(format!(
                    "Invalid delimiter '{}'. Use a single ASCII character",
                    delimiter
                )));
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// Holds the values found in `DV_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub batch_size: Option<usize>,
    pub batch_timeout: Option<Duration>,
    pub include_failed: Option<bool>,
    pub retry: Option<bool>,
    pub retry_scope: Option<RetryScope>,
    pub request_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub config: Option<String>,
}

/// Load configuration from environment variables.
///
/// Parses all `DV_*` environment variables and returns a structured
/// configuration. Invalid values are logged as warnings and ignored.
///
/// # Arguments
///
/// * `verbose` - Whether to log environment variable usage
pub fn load_env_config(verbose: bool) -> EnvConfig {
    let mut env_config = EnvConfig::default();

    if let Some(val) = env_var("DV_BATCH_SIZE", verbose) {
        match val.parse::<usize>() {
            Ok(size) if size > 0 => env_config.batch_size = Some(size),
            _ => tracing::warn!("Invalid DV_BATCH_SIZE='{}', must be a positive integer", val),
        }
    }

    env_config.batch_timeout = env_duration("DV_BATCH_TIMEOUT", verbose);
    env_config.request_timeout = env_duration("DV_REQUEST_TIMEOUT", verbose);
    env_config.connect_timeout = env_duration("DV_CONNECT_TIMEOUT", verbose);
    env_config.include_failed = env_bool("DV_INCLUDE_FAILED", verbose);
    env_config.retry = env_bool("DV_RETRY", verbose);

    if let Some(val) = env_var("DV_RETRY_SCOPE", verbose) {
        match val.parse::<RetryScope>() {
            Ok(scope) => env_config.retry_scope = Some(scope),
            Err(e) => tracing::warn!("Invalid DV_RETRY_SCOPE='{}': {}", val, e),
        }
    }

    env_config.config = env_var("DV_CONFIG", verbose);

    env_config
}

fn env_var(name: &str, verbose: bool) -> Option<String> {
    let val = env::var(name).ok()?;
    if val.trim().is_empty() {
        return None;
    }
    if verbose {
        tracing::info!("Using {}={}", name, val);
    }
    Some(val)
}

fn env_bool(name: &str, verbose: bool) -> Option<bool> {
    let val = env_var(name, verbose)?;
    let parsed = parse_bool(&val);
    if parsed.is_none() {
        tracing::warn!("Invalid {}='{}', use true/false", name, val);
    }
    parsed
}

fn env_duration(name: &str, verbose: bool) -> Option<Duration> {
    let val = env_var(name, verbose)?;
    match parse_timeout_string(&val) {
        Some(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            tracing::warn!("Invalid {}='{}', use format like '5s', '30s', '2m'", name, val);
            None
        }
    }
}

/// Parse the boolean spellings accepted in the environment.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a timeout string like "5s", "30s", "2m" into seconds.
///
/// # Arguments
///
/// * `timeout_str` - String representation of timeout
///
/// # Returns
///
/// Number of seconds, or None if parsing fails.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok()
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| m * 60)
    } else {
        // Assume seconds if no unit
        timeout_str.parse::<u64>().ok()
    }
}

/// Parse a field delimiter given as a single ASCII character.
///
/// `\t` and `tab` are accepted for tab-separated tables.
pub fn parse_delimiter(value: &str) -> Option<u8> {
    match value {
        "\\t" | "tab" => Some(b'\t'),
        _ => match value.as_bytes() {
            [byte] if byte.is_ascii() => Some(*byte),
            _ => None,
        },
    }
}
