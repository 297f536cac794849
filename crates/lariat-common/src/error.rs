//! Error types for the lariat workspace.
//!
//! The rope core itself never fails: inapplicable commands are ignored and
//! missing collaborators degrade to a reset. These types cover the ambient
//! surfaces around it (configuration files, scripted scenarios, I/O).

use thiserror::Error;

/// Top-level error type for lariat operations.
#[derive(Debug, Error)]
pub enum LariatError {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Scenario script errors
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration text could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// The configuration could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    /// A field holds a value that cannot be used
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid {
        /// Offending field name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Result type alias for lariat operations.
pub type LariatResult<T> = Result<T, LariatError>;
