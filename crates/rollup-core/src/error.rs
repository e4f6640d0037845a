//! Error types for rollup-core

use thiserror::Error;

/// Core error type for estimate rollup
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: Empty identifier
    #[error("[C004] Empty identifier in {context}")]
    EmptyId { context: String },

    /// C005: A sort code in `extras` does not belong to the named sort field
    #[error(
        "[C005] Line item '{line_item}' maps sort field '{sort_field}' to code '{sort_code}', \
         which belongs to '{owner}'"
    )]
    SortCodeFieldMismatch {
        line_item: String,
        sort_field: String,
        sort_code: String,
        owner: String,
    },

    /// C006: A sort field or sort code in `extras` is unknown
    #[error("[C006] Line item '{line_item}' references unknown {kind} '{id}'")]
    UnknownSortReference {
        line_item: String,
        kind: &'static str,
        id: String,
    },

    /// C007: IO error
    #[error("[C007] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// C008: IO error with file path context
    #[error("[C008] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C009: YAML parse error
    #[error("[C009] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
