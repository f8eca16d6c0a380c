//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("Malformed configuration: {0}")]
    InvalidFormat(String),

    /// Raised by validation; `field` is the dotted key, e.g. `monitor.sample_interval_ms`.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Configuration references ${{{0}}} but it is not set")]
    EnvVarNotSet(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}
