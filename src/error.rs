//! Error types for pgpool-prometheus.

use thiserror::Error;

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Descriptor construction or registry registration was rejected.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Invalid configuration value.
    #[error("invalid config: {0}")]
    Config(String),

    /// Config file could not be parsed.
    #[error("config file: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
