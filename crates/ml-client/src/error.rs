use thiserror::Error;

/// Errors that can occur when talking to the inference sidecar
#[derive(Error, Debug)]
pub enum MLClientError {
    #[error("Failed to connect to inference service: {0}")]
    ConnectionError(String),

    #[error("Generation failed: {0}")]
    GenerationError(String),

    #[error("Embedding failed: {0}")]
    EmbeddingError(String),

    #[error("Prompt does not fit the context window ({prompt_tokens} tokens, window {window})")]
    ContextExceeded { prompt_tokens: u32, window: u32 },

    #[error("Invalid response from inference service: {0}")]
    InvalidResponse(String),
}
