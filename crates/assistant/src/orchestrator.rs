//! # Conversation Orchestrator
//!
//! This module is the assistant's single entry point, `reply`:
//! 1. Normalize the session id and take the session's lock
//! 2. Handle a pick ("1", "2" or "3") answering a pending clarification
//! 3. Remember the question
//! 4. Run the tier chain (planner, then legacy, then the busy message)
//! 5. Keep any new clarification and update session memory
//!
//! Nothing here returns an error: the worst case is the busy message.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use catalog::{CatalogStore, Episode};
use ml_client::{Embedder, LanguageModel};
use pipeline::prompts::DEFAULT_PICK_QUESTION;
use pipeline::{LegacyPipeline, PlannerLoop, StrategyChain, Turn};
use retrieval::{CatalogResolver, ToolRegistry};

use crate::config::AssistantConfig;
use crate::conversation::{Conversation, ConversationStore};
use crate::memory::{MemoryConfig, normalize_session_id};

/// Replies that pick a candidate from a pending clarification
const PICK_REPLIES: [&str; 3] = ["1", "2", "3"];

/// One inbound message with the page context it was sent from
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub question: String,
    pub current_slug: Option<String>,
    pub current_episode: Option<Episode>,
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.current_slug = Some(slug.into());
        self
    }

    pub fn with_episode(mut self, episode: Episode) -> Self {
        self.current_episode = Some(episode);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Main orchestrator that answers chat messages
pub struct Orchestrator {
    chain: StrategyChain,
    conversations: ConversationStore,
    memory_config: MemoryConfig,
}

impl Orchestrator {
    /// Create an orchestrator around an already built tier chain
    pub fn new(chain: StrategyChain, memory_config: MemoryConfig) -> Self {
        Self {
            chain,
            conversations: ConversationStore::new(),
            memory_config,
        }
    }

    /// Wire the standard chain from its capabilities
    ///
    /// # Arguments
    /// * `store` - The catalog every tier reads from
    /// * `model` - Text generation for planning and answering
    /// * `embedder` - Query embeddings for semantic lookups
    /// * `config` - Thresholds and budgets for every component
    pub fn from_parts(
        store: Arc<dyn CatalogStore>,
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        config: &AssistantConfig,
    ) -> Self {
        let registry = Arc::new(ToolRegistry::new(store.clone(), embedder.clone()));
        let resolver = Arc::new(
            CatalogResolver::new(store.clone(), embedder.clone()).with_config(config.resolver.clone()),
        );

        let planner = PlannerLoop::new(registry, model.clone())
            .with_config(config.planner.clone())
            .with_resolver_config(config.resolver.clone());
        let legacy = LegacyPipeline::new(store, resolver, model, embedder)
            .with_config(config.legacy.clone())
            .with_summarizer_config(config.summarizer.clone());

        let chain = StrategyChain::new().add_strategy(planner).add_strategy(legacy);
        Self::new(chain, config.memory.clone())
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// Answer one message
    ///
    /// # Returns
    /// A generated answer, a clarification list, or one of the fixed messages
    #[instrument(skip(self, request), fields(session = tracing::field::Empty))]
    pub async fn reply(&self, request: ChatRequest) -> String {
        let start_time = Instant::now();
        let session_id = normalize_session_id(
            request.session_id.as_deref(),
            self.memory_config.session_id_max_chars,
        );
        tracing::Span::current().record("session", session_id.as_str());

        let handle = self.conversations.handle(&session_id);
        let mut conversation = handle.lock().await;

        let message = request.question.trim();

        if PICK_REPLIES.contains(&message) {
            if let Some(pending) = conversation.pending.take() {
                let picked = message.parse::<usize>().ok().and_then(|n| pending.pick(n)).cloned();
                let base_question = Some(pending.question)
                    .filter(|q| !q.trim().is_empty())
                    .or_else(|| conversation.last_question.take())
                    .unwrap_or_else(|| DEFAULT_PICK_QUESTION.to_string());
                conversation.last_question = None;

                match picked {
                    Some(brief) => {
                        info!(slug = %brief.slug, "clarification answered");
                        let slug = Some(brief.slug)
                            .filter(|s| !s.trim().is_empty())
                            .or(request.current_slug);
                        let turn = Turn::new(base_question)
                            .with_slug(slug)
                            .with_episode(request.current_episode)
                            .with_session(session_id.clone(), conversation.memory.context());
                        return self.answer(&mut conversation, turn, start_time).await;
                    }
                    None => debug!(pick = message, "pick out of range, clearing clarification"),
                }
            }
        } else if !message.is_empty() {
            // any other number is an answer to the list, just not a valid one
            if message.chars().all(|c| c.is_ascii_digit()) && conversation.pending.take().is_some() {
                debug!(reply = message, "not one of the offered choices, clearing clarification");
            }
            conversation.last_question = Some(request.question.clone());
        }

        let turn = Turn::new(request.question)
            .with_slug(request.current_slug)
            .with_episode(request.current_episode)
            .with_session(session_id.clone(), conversation.memory.context());
        self.answer(&mut conversation, turn, start_time).await
    }

    async fn answer(&self, conversation: &mut Conversation, turn: Turn, start_time: Instant) -> String {
        let outcome = self.chain.run(&turn).await;

        if let Some(pending) = outcome.clarification {
            conversation.pending = Some(pending);
        }
        if outcome.answer.is_remembered() {
            conversation
                .memory
                .update(&turn.question, &outcome.answer.text, &self.memory_config);
        }

        info!(
            answered_by = outcome.answered_by.as_deref().unwrap_or("fallback"),
            kind = ?outcome.answer.kind,
            elapsed = ?start_time.elapsed(),
            "reply ready"
        );
        outcome.answer.text
    }
}
