//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found at the specified path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The file extension has no enabled format.
    #[error("Unsupported or disabled configuration file format: .{0}")]
    UnsupportedFormat(String),

    /// Figment failed to merge or extract the configuration.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    ValidationError { message: String },

    /// A slice section references a slice that is not configured.
    #[error("Slice '{slice}' references unknown slice '{target}'")]
    UnknownSlice { slice: String, target: String },

    /// A memoize or exclusion glob does not compile.
    #[error("Invalid glob '{pattern}' in slice '{slice}': {reason}")]
    InvalidGlob {
        slice: String,
        pattern: String,
        reason: String,
    },
}

impl ConfigError {
    /// Creates a validation error with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Creates an unknown slice error.
    pub fn unknown_slice(slice: impl Into<String>, target: impl Into<String>) -> Self {
        Self::UnknownSlice {
            slice: slice.into(),
            target: target.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
