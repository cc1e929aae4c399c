//! Error types for the catalog crate.
//!
//! Loading errors carry enough context (file, reason, offending id) to be
//! logged as-is by the binary; lookup errors surface through the
//! [`CatalogStore`](crate::CatalogStore) trait so that remote store
//! implementations can report their own failures.

use thiserror::Error;

/// Errors that can occur while loading or querying the catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A data file couldn't be decoded
    #[error("Parse error in {file}: {reason}")]
    ParseError { file: String, reason: String },

    /// A data field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Referenced entity doesn't exist (e.g., transcript segment for an unknown movie)
    #[error("Missing reference: {entity} with key {key}")]
    MissingReference { entity: String, key: String },

    /// Data validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// The backing store could not answer a query
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, CatalogError>;
