//! Error types for the repflow_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for repflow_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Snapshot document failed schema validation on load/import
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Referenced exercise or block does not exist
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
