//! Error handling for domain validation runs.
//!
//! Only configuration-time problems are errors in this crate. Per-URL request
//! failures are plain data ([`crate::RequestFailure`]) that the outcome router
//! handles by policy, so they never show up here.

use std::fmt;

/// Main error type for the domain validator.
#[derive(Debug, Clone)]
pub enum DomainValidatorError {
    /// Invalid argument passed to a library operation (e.g. a zero batch size)
    InvalidArgument {
        name: String,
        reason: String,
    },

    /// A batch was requested after the batch sequence was exhausted
    BatchesExhausted,

    /// Configuration errors (invalid settings, malformed config files, etc.)
    ConfigError {
        message: String,
    },

    /// Source table could not be read or destination could not be written
    FileError {
        path: String,
        message: String,
    },

    /// Delimited table parsing or encoding errors
    TableError {
        message: String,
    },

    /// HTTP client construction errors
    TransportError {
        message: String,
    },

    /// Generic internal errors that don't fit other categories
    Internal {
        message: String,
    },
}

impl DomainValidatorError {
    /// Create a new invalid argument error.
    pub fn invalid_argument<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new transport error.
    pub fn transport<M: Into<String>>(message: M) -> Self {
        Self::TransportError {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl fmt::Display for DomainValidatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { name, reason } => {
                write!(f, "Invalid argument '{}': {}", name, reason)
            }
            Self::BatchesExhausted => write!(f, "No more batches in this sequence"),
            Self::ConfigError { message } => write!(f, "Configuration error: {}", message),
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::TableError { message } => write!(f, "Table error: {}", message),
            Self::TransportError { message } => write!(f, "Transport error: {}", message),
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for DomainValidatorError {}

impl From<std::io::Error> for DomainValidatorError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<csv::Error> for DomainValidatorError {
    fn from(err: csv::Error) -> Self {
        Self::TableError {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for DomainValidatorError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = DomainValidatorError::invalid_argument("batch_size", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid argument 'batch_size': must be at least 1"
        );

        let err = DomainValidatorError::file_error("in.csv", "not found");
        assert_eq!(err.to_string(), "File error at 'in.csv': not found");
    }
}
