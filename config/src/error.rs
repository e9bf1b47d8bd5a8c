//! Error types for tree and config file handling.

use thiserror::Error;

/// Errors that can occur while loading declaration or config files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The file extension does not name a supported format.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The declared tree or a config value was rejected by the core.
    #[error(transparent)]
    CoreError(#[from] argot_core::Error),
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
