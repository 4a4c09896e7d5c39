//! Error types for hs-output.

use thiserror::Error;

use hs_sim::RecordError;

/// Errors that can occur when reading or writing recorder output.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed stored row: {0}")]
    Malformed(String),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Alias for `Result<T, OutputError>`.
pub type OutputResult<T> = Result<T, OutputError>;

impl From<OutputError> for RecordError {
    fn from(e: OutputError) -> Self {
        match e {
            OutputError::Json(e) => RecordError::Serialization(e),
            other => RecordError::Backend(other.to_string()),
        }
    }
}
