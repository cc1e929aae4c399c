//! Core domain types for the movie catalog.
//!
//! This module defines the records the rest of the workspace reads:
//! - `CatalogEntry`: one movie or series with its metadata
//! - `TranscriptSegment`: a timestamped snippet of an episode's dialogue
//! - `EntryEmbedding`: a precomputed vector describing a whole entry
//! - `CatalogIndex`: the in-memory store holding all of the above

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// =============================================================================
// Type Aliases
// =============================================================================

/// Primary key of a catalog entry (the store's document id)
pub type EntryKey = String;

/// Episode number; single titles only have episode 1
pub type Episode = u32;

// =============================================================================
// Catalog Entries
// =============================================================================

/// Whether an entry is a one-off title or an episodic series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Single,
    Series,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Single => "single",
            EntryKind::Series => "series",
        }
    }
}

/// One movie or series in the catalog.
///
/// Entries are immutable once loaded; every consumer gets a clone or a
/// borrowed reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Primary key (document id)
    pub key: EntryKey,
    /// Secondary, human-facing code (used in links)
    pub code: Option<String>,
    pub slug: String,
    pub title: String,
    pub year: Option<u16>,
    pub kind: EntryKind,
    pub synopsis: String,
    pub cast: Vec<String>,
    pub director: Option<String>,
    pub tags: Vec<String>,
    /// Number of published episodes (1 for single titles)
    pub episode_count: u32,
    pub country: Option<String>,
    pub duration: Option<String>,
    pub rating: Option<f32>,
    pub series_status: Option<String>,
}

impl CatalogEntry {
    /// Create an entry with the identifying fields set and everything else empty
    pub fn new(
        key: impl Into<EntryKey>,
        slug: impl Into<String>,
        title: impl Into<String>,
        kind: EntryKind,
    ) -> Self {
        Self {
            key: key.into(),
            code: None,
            slug: slug.into(),
            title: title.into(),
            year: None,
            kind,
            synopsis: String::new(),
            cast: Vec::new(),
            director: None,
            tags: Vec::new(),
            episode_count: 1,
            country: None,
            duration: None,
            rating: None,
            series_status: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_synopsis(mut self, synopsis: impl Into<String>) -> Self {
        self.synopsis = synopsis.into();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_episode_count(mut self, count: u32) -> Self {
        self.episode_count = count;
        self
    }

    /// Site-relative link to the entry's detail page
    ///
    /// Prefers the secondary code and falls back to the slug, lower-cased.
    pub fn link(&self) -> Option<String> {
        movie_link(self.code.as_deref(), &self.slug)
    }

    /// Whether the entry carries every tag (`match_all`) or any of them
    pub fn has_tags(&self, tags: &[String], match_all: bool) -> bool {
        if match_all {
            tags.iter().all(|t| self.tags.contains(t))
        } else {
            tags.iter().any(|t| self.tags.contains(t))
        }
    }

    /// Projection used by bulk listings
    pub fn headline(&self) -> EntryHeadline {
        EntryHeadline {
            key: self.key.clone(),
            code: self.code.clone(),
            slug: self.slug.clone(),
            title: self.title.clone(),
            year: self.year,
            kind: self.kind,
        }
    }
}

/// `/movie/<code or slug>`, lower-cased; `None` when the entry has neither
pub fn movie_link(code: Option<&str>, slug: &str) -> Option<String> {
    let target = code
        .filter(|c| !c.is_empty())
        .or_else(|| Some(slug).filter(|s| !s.is_empty()))?;
    Some(format!("/movie/{}", target.to_lowercase()))
}

/// The handful of fields needed to match and list entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryHeadline {
    pub key: EntryKey,
    pub code: Option<String>,
    pub slug: String,
    pub title: String,
    pub year: Option<u16>,
    pub kind: EntryKind,
}

impl EntryHeadline {
    pub fn link(&self) -> Option<String> {
        movie_link(self.code.as_deref(), &self.slug)
    }
}

// =============================================================================
// Transcripts and Embeddings
// =============================================================================

/// A timestamped piece of an episode's transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub movie_key: EntryKey,
    pub episode: Episode,
    /// Offset from the start of the episode, in seconds
    pub start: f64,
    pub content: String,
    /// Precomputed embedding of `content`; empty when not synced yet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl TranscriptSegment {
    /// Render as one transcript line: `- [12s]: text`
    pub fn line(&self) -> String {
        format!("- [{}s]: {}", self.start, self.content)
    }
}

/// Precomputed embedding of a whole catalog entry (title + synopsis)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryEmbedding {
    pub movie_key: EntryKey,
    pub vector: Vec<f32>,
}

// =============================================================================
// CatalogIndex - The In-Memory Store
// =============================================================================

/// Holds every entry, segment and embedding with lookup indices.
///
/// Entries are kept in a `BTreeMap` so that listings come back in key order,
/// which keeps fuzzy resolution deterministic for a given snapshot.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    pub(crate) entries: BTreeMap<EntryKey, CatalogEntry>,
    /// slug -> key
    pub(crate) slug_index: HashMap<String, EntryKey>,
    /// secondary code -> key
    pub(crate) code_index: HashMap<String, EntryKey>,
    /// key -> episode -> segments sorted by start
    pub(crate) segments: HashMap<EntryKey, BTreeMap<Episode, Vec<TranscriptSegment>>>,
    pub(crate) entry_embeddings: BTreeMap<EntryKey, Vec<f32>>,
}

impl CatalogIndex {
    /// Creates a new, empty CatalogIndex
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an entry by primary key
    pub fn get_entry(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }

    /// Get an entry by slug
    pub fn get_by_slug(&self, slug: &str) -> Option<&CatalogEntry> {
        self.slug_index.get(slug).and_then(|key| self.entries.get(key))
    }

    /// Get an entry by secondary code
    pub fn get_by_code(&self, code: &str) -> Option<&CatalogEntry> {
        self.code_index.get(code).and_then(|key| self.entries.get(key))
    }

    /// All entries in key order
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Segments of one episode, sorted by start offset
    pub fn get_episode_segments(&self, key: &str, episode: Episode) -> &[TranscriptSegment] {
        self.segments
            .get(key)
            .and_then(|episodes| episodes.get(&episode))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Every segment of an entry, ordered by episode then start offset
    pub fn get_all_segments(&self, key: &str) -> Vec<&TranscriptSegment> {
        self.segments
            .get(key)
            .map(|episodes| episodes.values().flatten().collect())
            .unwrap_or_default()
    }

    /// Highest episode number that has transcript data
    pub fn get_latest_episode(&self, key: &str) -> Option<Episode> {
        self.segments
            .get(key)
            .and_then(|episodes| episodes.keys().next_back().copied())
    }

    /// Precomputed entry-level embedding
    pub fn get_entry_embedding(&self, key: &str) -> Option<&[f32]> {
        self.entry_embeddings.get(key).map(|v| v.as_slice())
    }

    /// Insert an entry and refresh its slug/code lookups
    pub fn insert_entry(&mut self, entry: CatalogEntry) {
        if !entry.slug.is_empty() {
            self.slug_index.insert(entry.slug.clone(), entry.key.clone());
        }
        if let Some(code) = entry.code.as_ref().filter(|c| !c.is_empty()) {
            self.code_index.insert(code.clone(), entry.key.clone());
        }
        self.entries.insert(entry.key.clone(), entry);
    }

    /// Insert a segment, keeping its episode sorted by start offset
    pub fn insert_segment(&mut self, segment: TranscriptSegment) {
        let episode = self
            .segments
            .entry(segment.movie_key.clone())
            .or_default()
            .entry(segment.episode)
            .or_default();
        let pos = episode.partition_point(|s| s.start <= segment.start);
        episode.insert(pos, segment);
    }

    /// Insert (or replace) an entry-level embedding
    pub fn insert_entry_embedding(&mut self, embedding: EntryEmbedding) {
        self.entry_embeddings
            .insert(embedding.movie_key, embedding.vector);
    }

    /// Get counts for debugging/validation: (entries, segments, entry embeddings)
    pub fn counts(&self) -> (usize, usize, usize) {
        let segments = self
            .segments
            .values()
            .flat_map(|episodes| episodes.values())
            .map(|v| v.len())
            .sum();
        (self.entries.len(), segments, self.entry_embeddings.len())
    }
}
