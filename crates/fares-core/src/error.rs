//! Core error types for the fares extractor.
//!
//! Errors raised before any scraping starts (bad ranges, bad airport codes,
//! broken configuration) live here. Per-query and sink failures have their
//! own error types in the crates that produce them.

use chrono::NaiveDate;
use thiserror::Error;

/// Central error type for core operations.
#[derive(Error, Debug)]
pub enum FaresError {
    /// The date range start lies after its end. Fatal: aborts the run
    /// before any scraping.
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange {
        /// First requested date
        start: NaiveDate,
        /// Last requested date
        end: NaiveDate,
    },

    /// The configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A value violates a data-model invariant (airport code, route, offer).
    #[error("validation error: {0}")]
    Validation(String),
}

/// Errors loading, saving or validating `config.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No home directory to place the config file in
    #[error("no config directory available on this system")]
    NoConfigDir,

    /// An explicitly given config path does not exist
    #[error("config file not found at {path}")]
    NotFound {
        /// Requested path
        path: String,
    },

    /// The file is not valid TOML for [`crate::AppConfig`]
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A setting or environment override holds an unusable value
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Setting or variable name
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type alias using `FaresError`.
pub type Result<T> = std::result::Result<T, FaresError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FaresError::Validation("bad airport".to_string());
        assert_eq!(err.to_string(), "validation error: bad airport");

        let err = ConfigError::InvalidValue {
            field: "FARES_ORIGIN".to_string(),
            reason: "expected three letters".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for FARES_ORIGIN: expected three letters"
        );
    }

    #[test]
    fn test_invalid_range_display() {
        let err = FaresError::InvalidRange {
            start: NaiveDate::from_ymd_opt(2025, 7, 2).expect("valid date"),
            end: NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date"),
        };
        assert_eq!(
            err.to_string(),
            "invalid date range: start 2025-07-02 is after end 2025-06-30"
        );
    }

    #[test]
    fn test_error_from_config() {
        let config_err = ConfigError::NoConfigDir;
        let err: FaresError = config_err.into();
        assert!(matches!(err, FaresError::Config(_)));
    }

    #[test]
    fn test_config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ConfigError = io_err.into();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
