//! LegacyPipeline - the deterministic answering tier
//!
//! Runs when the planner produced nothing. No tool choice is left to the
//! model: the movie is resolved directly, the request is classified, and a
//! single prompt is built from either the whole episode transcript or the
//! closest transcript snippets.
//!
//! ## Algorithm
//! 1. Movie: the turn's slug if it names one, else the resolver over the
//!    question (ambiguous gives a clarification, nothing gives a fixed message)
//! 2. Classify as summary or detail
//! 3. Summary: episode is explicit, else the latest one of a series, else 1;
//!    the constrained backend summarizes chunk by chunk, otherwise one large
//!    prompt asks for 6-8 sentences
//! 4. Detail: the `detail_top_k` nearest snippets of the movie, 3-5 sentences
//! 5. A failed generation gives the busy message

use crate::classify::{RequestMode, classify_request};
use crate::prompts::{
    BUSY_MESSAGE, DETAIL_INSTRUCTION, NO_TRANSCRIPT_MESSAGE, NOT_RECOGNIZED_MESSAGE,
    SUMMARY_INSTRUCTION, clarification_message, legacy_prompt, meta_block, segments_context,
    transcript_context,
};
use crate::summarizer::{SummarizerConfig, TranscriptSummarizer};
use crate::traits::AnswerStrategy;
use crate::turn::{Answer, PendingClarification, StrategyOutcome, Turn};
use anyhow::{Context, Result};
use async_trait::async_trait;
use catalog::{CatalogEntry, CatalogStore, EntryKind, Episode};
use ml_client::{Embedder, LanguageModel, ModelBackend};
use retrieval::vector::top_k_by_cosine;
use retrieval::{CatalogResolver, EpisodeDetector, MovieBrief, Resolution, render_transcript};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LegacyConfig {
    /// Snippets retrieved for detail questions
    pub detail_top_k: usize,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self { detail_top_k: 5 }
    }
}

/// Which movie a question is about
enum MovieChoice {
    Entry(Box<CatalogEntry>),
    Ambiguous(Vec<MovieBrief>),
    Unknown,
}

pub struct LegacyPipeline {
    store: Arc<dyn CatalogStore>,
    resolver: Arc<CatalogResolver>,
    model: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
    summarizer: TranscriptSummarizer,
    detector: EpisodeDetector,
    config: LegacyConfig,
}

impl LegacyPipeline {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        resolver: Arc<CatalogResolver>,
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            store,
            resolver,
            summarizer: TranscriptSummarizer::new(model.clone()),
            model,
            embedder,
            detector: EpisodeDetector::new(),
            config: LegacyConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LegacyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_summarizer_config(mut self, config: SummarizerConfig) -> Self {
        self.summarizer = TranscriptSummarizer::new(self.model.clone()).with_config(config);
        self
    }

    /// Answer one question; only store faults are errors
    #[instrument(skip(self, turn), fields(session = %turn.session_id))]
    pub async fn run(&self, turn: &Turn) -> Result<StrategyOutcome> {
        let entry = match self.choose_movie(turn).await? {
            MovieChoice::Entry(entry) => entry,
            MovieChoice::Ambiguous(candidates) => {
                let message = clarification_message(&candidates);
                return Ok(StrategyOutcome::answered(Answer::clarification(message))
                    .with_clarification(Some(PendingClarification {
                        candidates,
                        question: turn.question.clone(),
                    })));
            }
            MovieChoice::Unknown => {
                return Ok(StrategyOutcome::answered(Answer::fixed(NOT_RECOGNIZED_MESSAGE)));
            }
        };

        let mode = classify_request(self.model.as_ref(), &turn.question).await;
        info!(title = %entry.title, ?mode, "answering without planner");

        let (context, instruction) = match mode {
            RequestMode::Summary => {
                let episode = self.summary_episode(turn, &entry)?;
                let segments = self
                    .store
                    .transcript(&entry.key, Some(episode))
                    .with_context(|| format!("Failed to load transcript of {} episode {episode}", entry.key))?;
                let transcript = render_transcript(&segments);
                if transcript.trim().is_empty() {
                    debug!(episode, "no transcript for episode");
                    return Ok(StrategyOutcome::answered(Answer::fixed(NO_TRANSCRIPT_MESSAGE)));
                }

                if self.model.backend() == ModelBackend::Constrained {
                    if let Some(summary) = self
                        .summarizer
                        .summarize(&transcript, &entry.title, episode)
                        .await
                    {
                        return Ok(StrategyOutcome::answered(Answer::generated(summary)));
                    }
                }
                (transcript_context(episode, &transcript), SUMMARY_INSTRUCTION)
            }
            RequestMode::Detail => {
                let lines = self.nearest_lines(turn, &entry).await?;
                (segments_context(&lines), DETAIL_INSTRUCTION)
            }
        };

        let prompt = legacy_prompt(&meta_block(&entry), &context, instruction, &turn.question);
        let answer = match self.model.try_generate(&prompt, "legacy").await {
            Some(text) if !text.trim().is_empty() => Answer::generated(text.trim()),
            _ => Answer::fixed(BUSY_MESSAGE),
        };
        Ok(StrategyOutcome::answered(answer))
    }

    async fn choose_movie(&self, turn: &Turn) -> Result<MovieChoice> {
        if let Some(slug) = &turn.current_slug {
            let entry = self
                .store
                .entry_by_slug(slug)
                .with_context(|| format!("Failed to look up slug {slug}"))?;
            if let Some(entry) = entry {
                return Ok(MovieChoice::Entry(Box::new(entry)));
            }
            debug!(%slug, "current slug not in catalog, resolving from the question");
        }

        Ok(match self.resolver.resolve(&turn.question).await {
            Resolution::Matched(entry) => MovieChoice::Entry(Box::new(entry)),
            Resolution::Ambiguous(candidates) => MovieChoice::Ambiguous(candidates),
            Resolution::NotFound => MovieChoice::Unknown,
        })
    }

    /// Explicit episode, else the latest of a series, else 1
    fn summary_episode(&self, turn: &Turn, entry: &CatalogEntry) -> Result<Episode> {
        let explicit = turn
            .current_episode
            .or_else(|| self.detector.detect(&turn.question));
        let episode = match explicit {
            Some(episode) => Some(episode),
            None if entry.kind == EntryKind::Series => self
                .store
                .latest_episode(&entry.key)
                .context("Failed to look up the latest episode")?,
            None => Some(1),
        };
        Ok(episode.filter(|e| *e > 0).unwrap_or(1))
    }

    /// Transcript lines closest to the question, across all episodes
    async fn nearest_lines(&self, turn: &Turn, entry: &CatalogEntry) -> Result<Vec<String>> {
        let segments = self
            .store
            .segment_embeddings(&entry.key, None)
            .context("Failed to load segment embeddings")?;
        if segments.is_empty() {
            return Ok(Vec::new());
        }

        let query = match self.embedder.embed(&turn.question).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "question embedding failed, answering without snippets");
                return Ok(Vec::new());
            }
        };
        Ok(top_k_by_cosine(
            &query,
            segments.iter().map(|s| s.embedding.as_slice()),
            self.config.detail_top_k.max(1),
        )
        .into_iter()
        .map(|(idx, _)| segments[idx].line())
        .collect())
    }
}

#[async_trait]
impl AnswerStrategy for LegacyPipeline {
    fn name(&self) -> &str {
        "legacy"
    }

    async fn answer(&self, turn: &Turn) -> Result<StrategyOutcome> {
        self.run(turn).await
    }
}
