//! In-process doubles for the inference capabilities.
//!
//! Used by the tests of every crate above this one and by the CLI's
//! offline mode; none of them touch the network.

use crate::config::ModelBackend;
use crate::error::MLClientError;
use crate::traits::{Embedder, LanguageModel};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<Option<String>>>),
    Respond(Responder),
}

/// A language model that answers from a script and records every prompt.
///
/// A `None` in the script is a generation failure.
pub struct ScriptedModel {
    backend: ModelBackend,
    script: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    /// Answer prompts in order from a fixed list; fail once it runs out
    pub fn queued<I, S>(backend: ModelBackend, replies: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let queue = replies.into_iter().map(|r| r.map(Into::into)).collect();
        Self {
            backend,
            script: Script::Queue(Mutex::new(queue)),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answer each prompt with a function of the prompt
    pub fn responding<F>(backend: ModelBackend, responder: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            backend,
            script: Script::Respond(Box::new(responder)),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A model whose every call fails
    pub fn failing(backend: ModelBackend) -> Self {
        Self::responding(backend, |_| None)
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn backend(&self) -> ModelBackend {
        self.backend
    }

    async fn generate(&self, prompt: &str) -> Result<String, MLClientError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        let reply = match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
                .flatten(),
            Script::Respond(respond) => respond(prompt),
        };
        reply.ok_or_else(|| MLClientError::GenerationError("scripted failure".into()))
    }
}

/// Deterministic embedder: hashed bag of lower-cased words, L2-normalized.
///
/// Texts sharing words get a positive cosine, disjoint texts get zero.
#[derive(Debug, Clone)]
pub struct BagOfWordsEmbedder {
    dims: usize,
}

impl Default for BagOfWordsEmbedder {
    fn default() -> Self {
        Self { dims: 64 }
    }
}

impl BagOfWordsEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    /// FNV-1a, so buckets are stable across runs and platforms
    fn bucket(&self, word: &str) -> usize {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash % self.dims as u64) as usize
    }

    /// Embed without going through the async trait
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[self.bucket(&word.to_lowercase())] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for BagOfWordsEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MLClientError> {
        Ok(self.embed_text(text))
    }
}

/// An embedder whose every call fails
#[derive(Debug, Clone, Default)]
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, MLClientError> {
        Err(MLClientError::EmbeddingError("embedder offline".into()))
    }
}
