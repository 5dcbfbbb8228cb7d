//! Error types for schema flattening, navigation and data generation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema error at {path}: {message}")]
    Schema { path: String, message: String },

    #[error("Unresolvable $ref at {path}: {reference}")]
    UnresolvableRef { path: String, reference: String },

    #[error("Recursion depth exceeded at {path} (max: {max_depth})")]
    RecursionDepthExceeded { path: String, max_depth: usize },

    #[error("Invalid path {path}: {message}")]
    InvalidPath { path: String, message: String },

    #[error("Cannot generate a string for pattern {pattern}: {message}")]
    Pattern { pattern: String, message: String },
}
