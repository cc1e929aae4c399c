//! Error types for the retrieval crate.
//!
//! Tool handlers return [`ToolError`]; the registry turns every one of them
//! into an `{"error": "..."}` payload, so these never reach the user.

use catalog::CatalogError;
use ml_client::MLClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    /// The catalog store failed to answer
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The embedding service failed
    #[error("embedding error: {0}")]
    Embedding(#[from] MLClientError),

    /// A required argument was absent or empty
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// The tool name is not part of the registry
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

pub type Result<T> = std::result::Result<T, ToolError>;
