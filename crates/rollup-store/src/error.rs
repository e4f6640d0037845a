//! Error types for rollup-store

use thiserror::Error;

/// Record store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Estimate not found (S001)
    #[error("[S001] Estimate not found: {0}")]
    EstimateNotFound(String),

    /// Duplicate record id within a table (S002)
    #[error("[S002] Duplicate {table} record '{id}'")]
    DuplicateRecord { table: &'static str, id: String },

    /// Failed to read a record file (S003)
    #[error("[S003] Failed to read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse a record file (S004)
    #[error("[S004] Failed to parse '{path}': {message}")]
    Parse { path: String, message: String },

    /// Backend failure (S005)
    #[error("[S005] Record store error: {0}")]
    Internal(String),
}

/// Result type alias for StoreError
pub type StoreResult<T> = Result<T, StoreError>;
