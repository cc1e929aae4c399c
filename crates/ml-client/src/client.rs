//! gRPC client for the inference sidecar.
//!
//! One channel serves both capabilities: text generation
//! (`lumi.inference.Generator`) and sentence embeddings
//! (`lumi.inference.Embedder`). It handles:
//! - Connection management and per-request timeouts
//! - Context-window budgeting when the backend is constrained
//! - Mapping gRPC status codes onto [`MLClientError`]

use crate::budget::{shrink_prompt, token_budget};
use crate::config::{InferenceConfig, ModelBackend};
use crate::error::MLClientError;
use crate::proto::embedder_client::EmbedderClient as GrpcEmbedderClient;
use crate::proto::generator_client::GeneratorClient as GrpcGeneratorClient;
use crate::proto::{CountTokensRequest, EmbedRequest, GenerateRequest};
use crate::traits::{Embedder, LanguageModel};
use async_trait::async_trait;
use std::borrow::Cow;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, error, info, warn};

/// Client for the inference sidecar.
///
/// Cheap to clone; clones share the underlying channel.
#[derive(Clone)]
pub struct InferenceClient {
    generator: GrpcGeneratorClient<Channel>,
    embedder: GrpcEmbedderClient<Channel>,
    config: InferenceConfig,
}

impl InferenceClient {
    fn endpoint(config: &InferenceConfig) -> Result<Endpoint, MLClientError> {
        Ok(Endpoint::from_shared(config.addr.clone())
            .map_err(|e| MLClientError::ConnectionError(format!("{}: {e}", config.addr)))?
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(5)))
    }

    /// Connect to the inference service, failing if it is unreachable.
    ///
    /// # Arguments
    /// * `config` - Address, backend and generation parameters
    ///
    /// # Returns
    /// A connected client ready to generate and embed
    pub async fn connect(config: InferenceConfig) -> Result<Self, MLClientError> {
        info!(addr = %config.addr, backend = %config.backend, "Connecting to inference service");
        let channel = Self::endpoint(&config)?
            .connect()
            .await
            .map_err(|e| MLClientError::ConnectionError(e.to_string()))?;
        Ok(Self::from_channel(channel, config))
    }

    /// Build a client that connects on first use.
    ///
    /// Useful when the service may come up after the process starts; every
    /// call made while it is down fails like any other generation failure.
    pub fn connect_lazy(config: InferenceConfig) -> Result<Self, MLClientError> {
        info!(addr = %config.addr, backend = %config.backend, "Using lazily connected inference service");
        let channel = Self::endpoint(&config)?.connect_lazy();
        Ok(Self::from_channel(channel, config))
    }

    fn from_channel(channel: Channel, config: InferenceConfig) -> Self {
        Self {
            generator: GrpcGeneratorClient::new(channel.clone()),
            embedder: GrpcEmbedderClient::new(channel),
            config,
        }
    }

    /// Get the address of the inference service
    pub fn service_address(&self) -> &str {
        &self.config.addr
    }

    /// Token count of `text`, or `None` when the service can't tell
    async fn count_tokens(&self, text: &str) -> Option<u32> {
        let request = CountTokensRequest {
            text: text.to_string(),
        };
        match self.generator.clone().count_tokens(request).await {
            Ok(response) => Some(response.into_inner().count),
            Err(status) => {
                debug!(error = %status, "token counting unavailable");
                None
            }
        }
    }

    /// Fit a prompt into the constrained context window.
    ///
    /// Returns the (possibly shrunk) prompt and the completion budget.
    async fn fit_prompt<'a>(&self, prompt: &'a str) -> Result<(Cow<'a, str>, u32), MLClientError> {
        let generation = &self.config.generation;
        let tokens = self.count_tokens(prompt).await;
        let budget = token_budget(tokens, generation.reserve_tokens, generation);
        if budget > 0 {
            return Ok((Cow::Borrowed(prompt), budget as u32));
        }

        let shrunk = shrink_prompt(prompt, generation);
        let shrunk_tokens = self.count_tokens(&shrunk).await;
        warn!(
            original_chars = prompt.chars().count(),
            shrunk_chars = shrunk.chars().count(),
            "prompt exceeds context window, shrinking"
        );
        let budget = token_budget(shrunk_tokens, generation.retry_reserve_tokens, generation);
        if budget > 0 {
            Ok((Cow::Owned(shrunk), budget as u32))
        } else {
            Err(MLClientError::ContextExceeded {
                prompt_tokens: shrunk_tokens.or(tokens).unwrap_or_default(),
                window: generation.context_window,
            })
        }
    }
}

#[async_trait]
impl LanguageModel for InferenceClient {
    fn backend(&self) -> ModelBackend {
        self.config.backend
    }

    async fn generate(&self, prompt: &str) -> Result<String, MLClientError> {
        let generation = &self.config.generation;
        let (prompt, max_tokens) = match self.config.backend {
            ModelBackend::Primary => (Cow::Borrowed(prompt), generation.max_tokens),
            ModelBackend::Constrained => self.fit_prompt(prompt).await?,
        };
        debug!(chars = prompt.len(), max_tokens, "Generating");

        let request = GenerateRequest {
            prompt: prompt.into_owned(),
            max_tokens,
            temperature: generation.temperature,
        };
        let response = self
            .generator
            .clone()
            .generate(request)
            .await
            .map_err(|status| {
                error!("gRPC error while generating: {}", status);
                MLClientError::GenerationError(status.to_string())
            })?;
        Ok(response.into_inner().text)
    }
}

#[async_trait]
impl Embedder for InferenceClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MLClientError> {
        let request = EmbedRequest {
            texts: vec![text.to_string()],
        };
        let response = self
            .embedder
            .clone()
            .embed(request)
            .await
            .map_err(|status| {
                error!("gRPC error while embedding: {}", status);
                MLClientError::EmbeddingError(status.to_string())
            })?;

        response
            .into_inner()
            .vectors
            .into_iter()
            .next()
            .map(|v| v.values)
            .filter(|values| !values.is_empty())
            .ok_or_else(|| MLClientError::InvalidResponse("empty embedding".into()))
    }
}
