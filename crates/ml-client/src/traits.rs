//! Capabilities the answering pipeline depends on.

use crate::config::ModelBackend;
use crate::error::MLClientError;
use async_trait::async_trait;
use tracing::warn;

/// A text generation service.
///
/// Implementations may fail at any time (service down, context exceeded);
/// callers that can degrade use [`LanguageModel::try_generate`].
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Which backend serves this model
    fn backend(&self) -> ModelBackend;

    /// Generate a completion for one prompt
    async fn generate(&self, prompt: &str) -> Result<String, MLClientError>;

    /// Generate, logging and swallowing failures.
    ///
    /// `label` names the call site in the log line.
    async fn try_generate(&self, prompt: &str, label: &str) -> Option<String> {
        match self.generate(prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(label, error = %e, "generation failed");
                None
            }
        }
    }
}

/// A sentence embedding service
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MLClientError>;
}
