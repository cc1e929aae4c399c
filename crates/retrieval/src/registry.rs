//! ToolRegistry - executes typed tool calls against the catalog
//!
//! Every tool returns a JSON object. Nothing escapes the registry as an
//! error: a failing handler yields `{"error": "<message>"}` so the planner
//! can read what went wrong and carry on.

use crate::brief::MovieBrief;
use crate::error::{Result, ToolError};
use crate::resolver::CatalogResolver;
use crate::text::truncate_chars;
use crate::tools::{MovieTarget, ToolCall, ToolName};
use crate::vector::top_k_by_cosine;
use catalog::{CatalogEntry, CatalogStore, Episode, TranscriptSegment};
use ml_client::Embedder;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Synopsis snippet length in search results
pub const SYNOPSIS_SNIPPET_CHARS: usize = 240;
/// Segment snippet length in `search_video_vectors` results
pub const SEGMENT_SNIPPET_CHARS: usize = 280;

/// Join segments into transcript text, one `- [start s]: content` line each
pub fn render_transcript(segments: &[TranscriptSegment]) -> String {
    segments.iter().fold(String::new(), |mut out, segment| {
        out.push_str(&segment.line());
        out.push('\n');
        out
    })
}

/// The fixed set of retrieval tools
pub struct ToolRegistry {
    store: Arc<dyn CatalogStore>,
    embedder: Arc<dyn Embedder>,
}

impl ToolRegistry {
    pub fn new(store: Arc<dyn CatalogStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Run a call; failures become an `{"error": ...}` payload
    pub async fn execute(&self, call: &ToolCall) -> Value {
        match self.run(call).await {
            Ok(value) => value,
            Err(e) => {
                warn!(tool = %call.name(), error = %e, "tool failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    /// Run a tool by name with raw JSON arguments
    pub async fn execute_named(&self, name: &str, args: &Map<String, Value>) -> Value {
        match ToolName::parse(name) {
            Some(tool) => self.execute(&ToolCall::from_args(tool, args)).await,
            None => json!({ "error": ToolError::UnknownTool(name.to_string()).to_string() }),
        }
    }

    /// Run a call, surfacing handler errors
    pub async fn run(&self, call: &ToolCall) -> Result<Value> {
        debug!(tool = %call.name(), "running tool");
        match call {
            ToolCall::FindMovieByName { query, top_k } => self.find_movie_by_name(query, *top_k),
            ToolCall::SearchMoviesByText { query, top_k } => {
                self.search_movies_by_text(query, *top_k).await
            }
            ToolCall::SearchMoviesByTags {
                tags,
                top_k,
                match_all,
            } => self.search_movies_by_tags(tags, *top_k, *match_all),
            ToolCall::GetMovieMeta { target } => self.get_movie_meta(target),
            ToolCall::SearchVideoVectors {
                query,
                target,
                episode,
                top_k,
            } => {
                self.search_video_vectors(query, target, *episode, *top_k)
                    .await
            }
            ToolCall::GetFullTranscript {
                target,
                episode,
                max_chars,
            } => self.get_full_transcript(target, *episode, *max_chars),
        }
    }

    /// Resolve `movie_id | slug | movie_code`.
    ///
    /// `movie_id` is tried as primary key, then as slug, then as code;
    /// then `slug`, then `movie_code`. First hit wins.
    pub fn resolve_entry(&self, target: &MovieTarget) -> Result<Option<CatalogEntry>> {
        if let Some(id) = &target.movie_id {
            if let Some(entry) = self.store.entry_by_key(id)? {
                return Ok(Some(entry));
            }
            if let Some(entry) = self.store.entry_by_slug(id)? {
                return Ok(Some(entry));
            }
            if let Some(entry) = self.store.entry_by_code(id)? {
                return Ok(Some(entry));
            }
        }
        if let Some(slug) = &target.slug {
            if let Some(entry) = self.store.entry_by_slug(slug)? {
                return Ok(Some(entry));
            }
        }
        if let Some(code) = &target.movie_code {
            if let Some(entry) = self.store.entry_by_code(code)? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    fn find_movie_by_name(&self, query: &str, top_k: usize) -> Result<Value> {
        if query.is_empty() {
            return Err(ToolError::MissingArgument("query"));
        }
        let headlines = self.store.list_headlines()?;
        if headlines.is_empty() {
            return Ok(json!({ "matches": [], "note": "Không có phim trong DB." }));
        }

        let matches: Vec<MovieBrief> = CatalogResolver::rank(query, &headlines)
            .into_iter()
            .take(top_k.max(1))
            .map(|r| MovieBrief::from(&r.headline).with_score(r.score))
            .collect();
        Ok(json!({ "matches": matches }))
    }

    async fn search_movies_by_text(&self, query: &str, top_k: usize) -> Result<Value> {
        if query.is_empty() {
            return Err(ToolError::MissingArgument("query"));
        }
        let embeddings = self.store.entry_embeddings()?;
        if embeddings.is_empty() {
            return Ok(json!({ "matches": [], "note": "Chưa có movie_embeddings." }));
        }

        let query_vector = self.embedder.embed(query).await?;
        let top = top_k_by_cosine(
            &query_vector,
            embeddings.iter().map(|e| e.vector.as_slice()),
            top_k.max(1),
        );

        let mut matches = Vec::with_capacity(top.len());
        for (idx, score) in top {
            let Some(entry) = self.store.entry_by_key(&embeddings[idx].movie_key)? else {
                continue;
            };
            let mut item = brief_value(&entry, Some(score as f64));
            item.insert(
                "synopsis".into(),
                Value::String(truncate_chars(&entry.synopsis, SYNOPSIS_SNIPPET_CHARS)),
            );
            matches.push(Value::Object(item));
        }
        Ok(json!({ "matches": matches }))
    }

    fn search_movies_by_tags(&self, tags: &[String], top_k: usize, match_all: bool) -> Result<Value> {
        if tags.is_empty() {
            return Ok(json!({ "matches": [], "note": "Thiếu tags để tìm kiếm." }));
        }

        let matches: Vec<Value> = self
            .store
            .entries_with_tags(tags, match_all, top_k)?
            .iter()
            .map(|entry| {
                let mut item = brief_value(entry, None);
                item.insert(
                    "synopsis".into(),
                    Value::String(truncate_chars(&entry.synopsis, SYNOPSIS_SNIPPET_CHARS)),
                );
                Value::Object(item)
            })
            .collect();
        Ok(json!({ "matches": matches, "tags": tags, "match_all": match_all }))
    }

    fn get_movie_meta(&self, target: &MovieTarget) -> Result<Value> {
        let Some(entry) = self.resolve_entry(target)? else {
            return Ok(json!({ "movie": null, "note": "Không tìm thấy phim." }));
        };

        Ok(json!({
            "movie": {
                "id": entry.code,
                "slug": entry.slug,
                "title": entry.title,
                "link": entry.link(),
                "type": entry.kind.as_str(),
                "synopsis": entry.synopsis,
                "year": entry.year,
                "duration": entry.duration,
                "rating": entry.rating,
                "tags": entry.tags,
                "cast": entry.cast,
                "director": entry.director,
                "country": entry.country,
                "seriesStatus": entry.series_status,
                "episodes_count": entry.episode_count,
            }
        }))
    }

    async fn search_video_vectors(
        &self,
        query: &str,
        target: &MovieTarget,
        episode: Option<Episode>,
        top_k: usize,
    ) -> Result<Value> {
        let Some(entry) = self.resolve_entry(target)? else {
            return Ok(json!({ "matches": [], "note": "Không tìm thấy phim." }));
        };
        let segments = self.store.segment_embeddings(&entry.key, episode)?;
        if segments.is_empty() {
            return Ok(json!({ "matches": [], "note": "Chưa có dữ liệu video_vectors." }));
        }
        if query.is_empty() {
            return Err(ToolError::MissingArgument("query"));
        }

        let query_vector = self.embedder.embed(query).await?;
        let matches: Vec<Value> = top_k_by_cosine(
            &query_vector,
            segments.iter().map(|s| s.embedding.as_slice()),
            top_k.max(1),
        )
        .into_iter()
        .map(|(idx, score)| {
            let segment = &segments[idx];
            json!({
                "start": segment.start,
                "episode": segment.episode,
                "content": truncate_chars(&segment.content, SEGMENT_SNIPPET_CHARS),
                "score": score,
            })
        })
        .collect();

        Ok(json!({ "movie": MovieBrief::from(&entry), "matches": matches }))
    }

    fn get_full_transcript(
        &self,
        target: &MovieTarget,
        episode: Option<Episode>,
        max_chars: Option<usize>,
    ) -> Result<Value> {
        let Some(entry) = self.resolve_entry(target)? else {
            return Ok(json!({ "content": "", "note": "Không tìm thấy phim." }));
        };

        let mut content = render_transcript(&self.store.transcript(&entry.key, episode)?);
        let mut truncated = false;
        if let Some(limit) = max_chars {
            if content.chars().count() > limit {
                content = truncate_chars(&content, limit);
                truncated = true;
            }
        }

        Ok(json!({
            "movie": MovieBrief::from(&entry),
            "episode": episode,
            "content": content,
            "truncated": truncated,
        }))
    }
}

/// A brief as a JSON map, ready for extra fields
fn brief_value(entry: &CatalogEntry, score: Option<f64>) -> Map<String, Value> {
    let mut brief = MovieBrief::from(entry);
    brief.score = score;
    match serde_json::to_value(brief) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
