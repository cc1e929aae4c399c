//! CatalogResolver - free text to catalog entry
//!
//! Turns a loose movie reference ("rồng", "doraemn tập 5", "phim về cậu bé
//! có túi thần kỳ") into one entry, a short list to choose from, or nothing.
//!
//! ## Algorithm
//! 1. Slug + lower-case the input once ([`FuzzyQuery`])
//! 2. Score every entry's slug and title in parallel, rank highest first
//!    (ties broken by catalog key)
//! 3. Best score >= `match_threshold`:
//!    - other entries within `ambiguity_delta` of it -> ambiguous, up to
//!      `max_candidates` of them
//!    - otherwise -> that entry
//! 4. No fuzzy match: embed the input and take the nearest entry embedding
//!    if its cosine is >= `semantic_threshold`
//! 5. A catalog holding exactly one entry returns it (if `accept_sole_entry`)

use crate::brief::MovieBrief;
use crate::fuzzy::FuzzyQuery;
use crate::vector::cosine_similarity;
use catalog::{CatalogEntry, CatalogStore, EntryHeadline};
use ml_client::Embedder;
use rayon::prelude::*;
use serde::Deserialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Resolver thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Minimum fuzzy score (0-100) for a confident match
    pub match_threshold: f64,
    /// Candidates this close to the best score make the match ambiguous
    pub ambiguity_delta: f64,
    /// Most candidates offered in a clarification
    pub max_candidates: usize,
    /// Minimum cosine for the semantic fallback
    pub semantic_threshold: f32,
    /// Return the only entry of a one-entry catalog when nothing matched
    pub accept_sole_entry: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            match_threshold: 75.0,
            ambiguity_delta: 6.0,
            max_candidates: 3,
            semantic_threshold: 0.35,
            accept_sole_entry: true,
        }
    }
}

impl ResolverConfig {
    pub fn with_match_threshold(mut self, threshold: f64) -> Self {
        self.match_threshold = threshold;
        self
    }

    pub fn with_ambiguity_delta(mut self, delta: f64) -> Self {
        self.ambiguity_delta = delta;
        self
    }

    pub fn with_sole_entry_override(mut self, accept: bool) -> Self {
        self.accept_sole_entry = accept;
        self
    }

    /// How many of the ranked candidates form an ambiguous set.
    ///
    /// `scores` must be sorted highest first. Returns 0 when the best score
    /// misses the threshold or stands alone, otherwise 2..=`max_candidates`.
    pub fn ambiguous_count(&self, scores: &[f64]) -> usize {
        let Some(&best) = scores.first() else {
            return 0;
        };
        if best < self.match_threshold {
            return 0;
        }
        let close = scores
            .iter()
            .take_while(|s| best - **s <= self.ambiguity_delta)
            .count();
        if close > 1 {
            close.min(self.max_candidates.max(2))
        } else {
            0
        }
    }
}

/// Outcome of resolving a free-text reference
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Matched(CatalogEntry),
    /// Ranked highest first, at most `max_candidates`
    Ambiguous(Vec<MovieBrief>),
    NotFound,
}

/// One fuzzy-ranked entry
#[derive(Debug, Clone)]
pub struct RankedEntry {
    pub score: f64,
    pub headline: EntryHeadline,
}

/// Resolves movie references against the catalog
pub struct CatalogResolver {
    store: Arc<dyn CatalogStore>,
    embedder: Arc<dyn Embedder>,
    config: ResolverConfig,
}

impl CatalogResolver {
    pub fn new(store: Arc<dyn CatalogStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Score every headline against `query`, best first.
    ///
    /// Entries scoring 0 are dropped. Equal scores are ordered by key so the
    /// ranking is stable for a given catalog.
    pub fn rank(query: &str, headlines: &[EntryHeadline]) -> Vec<RankedEntry> {
        let prepared = FuzzyQuery::new(query);
        let mut ranked: Vec<RankedEntry> = headlines
            .par_iter()
            .map(|h| RankedEntry {
                score: prepared.score(&h.slug, &h.title),
                headline: h.clone(),
            })
            .filter(|r| r.score > 0.0)
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.headline.key.cmp(&b.headline.key))
        });
        ranked
    }

    /// Resolve a free-text movie reference
    #[instrument(skip(self, text), fields(query = %text))]
    pub async fn resolve(&self, text: &str) -> Resolution {
        let headlines = match self.store.list_headlines() {
            Ok(headlines) => headlines,
            Err(e) => {
                warn!(error = %e, "catalog listing failed");
                return Resolution::NotFound;
            }
        };
        if headlines.is_empty() {
            return Resolution::NotFound;
        }

        let ranked = Self::rank(text, &headlines);
        let scores: Vec<f64> = ranked.iter().map(|r| r.score).collect();

        if let Some(best) = ranked.first().filter(|b| b.score >= self.config.match_threshold) {
            let ambiguous = self.config.ambiguous_count(&scores);
            if ambiguous > 0 {
                let candidates: Vec<MovieBrief> = ranked[..ambiguous]
                    .iter()
                    .map(|r| MovieBrief::from(&r.headline).with_score(r.score))
                    .collect();
                info!(candidates = candidates.len(), best = best.score, "ambiguous movie reference");
                return Resolution::Ambiguous(candidates);
            }
            debug!(title = %best.headline.title, score = best.score, "fuzzy match");
            if let Some(entry) = self.fetch(&best.headline.key) {
                return Resolution::Matched(entry);
            }
        }

        if let Some(entry) = self.semantic_match(text).await {
            return Resolution::Matched(entry);
        }

        if headlines.len() == 1 && self.config.accept_sole_entry {
            debug!("single-entry catalog, accepting its only entry");
            if let Some(entry) = self.fetch(&headlines[0].key) {
                return Resolution::Matched(entry);
            }
        }

        Resolution::NotFound
    }

    fn fetch(&self, key: &str) -> Option<CatalogEntry> {
        match self.store.entry_by_key(key) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "entry lookup failed");
                None
            }
        }
    }

    /// Nearest entry embedding, if close enough
    async fn semantic_match(&self, text: &str) -> Option<CatalogEntry> {
        let embeddings = match self.store.entry_embeddings() {
            Ok(e) if !e.is_empty() => e,
            Ok(_) => {
                warn!("no entry embeddings available for semantic matching");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "entry embeddings unavailable");
                return None;
            }
        };
        let query = match self.embedder.embed(text).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "query embedding failed");
                return None;
            }
        };

        let mut best: Option<(f32, &str)> = None;
        for embedding in &embeddings {
            let score = cosine_similarity(&query, &embedding.vector);
            if best.is_none_or(|(b, _)| score > b) {
                best = Some((score, &embedding.movie_key));
            }
        }

        let (score, key) = best?;
        if score < self.config.semantic_threshold {
            debug!(score, "semantic match below threshold");
            return None;
        }
        debug!(key, score, "semantic match");
        self.fetch(key)
    }
}
