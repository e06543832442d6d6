//! Configuration loading/validation errors.

use thiserror::Error;

/// Everything that can go wrong while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read from disk.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file's contents could not be parsed.
    #[error("failed to parse config file {path} as {format}: {source}")]
    Parse {
        /// Path that was being parsed.
        path: String,
        /// Detected format (`yaml`, `toml`, `json`).
        format: &'static str,
        /// Underlying parse error.
        #[source]
        source: anyhow::Error,
    },

    /// An environment variable held a value that could not be parsed into
    /// its target type.
    #[error("environment variable {name} has an invalid value: {reason}")]
    InvalidEnvValue {
        /// Variable name.
        name: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The assembled configuration failed structural validation.
    #[error("configuration is invalid: {0}")]
    Invalid(String),
}
