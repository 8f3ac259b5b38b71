//! Error types for the kanon library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for kanon operations.
#[derive(Debug, Error)]
pub enum KanonError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error coercing a cell into its declared type.
    #[error("Parse error at row {row}, column '{column}': {message}")]
    Parse {
        row: usize,
        column: String,
        message: String,
    },

    /// Empty file or no data to anonymize.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error (invalid bias, malformed hierarchy, bad k).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Partitioning strategy name not recognized.
    #[error("Partitioning strategy '{0}' not supported")]
    UnsupportedStrategy(String),

    /// A generalization or aggregation was invoked on an attribute whose
    /// declared type does not support it.
    #[error("Usage error: {0}")]
    Usage(String),
}

/// Result type alias for kanon operations.
pub type Result<T> = std::result::Result<T, KanonError>;
