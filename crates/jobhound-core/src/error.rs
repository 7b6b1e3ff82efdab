//! Core error types for jobhound.
//!
//! This module defines the error type shared by the crawl crates for
//! configuration and input validation failures.

use thiserror::Error;

/// Central error type for core operations.
#[derive(Error, Debug)]
pub enum JobhoundError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (invalid search criteria, malformed records)
    #[error("validation error: {0}")]
    Validation(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Config file not found
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `JobhoundError`.
pub type Result<T> = std::result::Result<T, JobhoundError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = JobhoundError::Validation("empty city".to_string());
        assert_eq!(err.to_string(), "validation error: empty city");

        let err = ConfigError::InvalidValue {
            field: "pacing.detail_dwell".to_string(),
            reason: "max_ms must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for pacing.detail_dwell: max_ms must be positive"
        );
    }

    #[test]
    fn test_error_from_config() {
        let config_err = ConfigError::NoConfigDir;
        let err: JobhoundError = config_err.into();
        assert!(matches!(err, JobhoundError::Config(_)));
    }
}
