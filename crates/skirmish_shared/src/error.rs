//! # Shared Error Types
//!
//! Errors raised while parsing user input and loading configuration.

use thiserror::Error;

/// A join code that is not exactly six alphanumeric characters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid join code {input:?}: expected exactly 6 letters or digits")]
pub struct InvalidJoinCode {
    /// What the user typed.
    pub input: String,
}

/// Errors that can occur while loading config or catalog files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for the expected schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file parsed but a value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for config loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
