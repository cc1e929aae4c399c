//! The read-only catalog capability consumed by retrieval and answering.
//!
//! Everything above this crate talks to the catalog through [`CatalogStore`],
//! so a remote document store can stand in for the in-memory
//! [`CatalogIndex`] without touching the tools or the resolver.

use crate::error::Result;
use crate::types::*;

/// Read-only access to catalog entries, transcripts and embeddings.
///
/// Implementations return owned values; lookups that find nothing return
/// `Ok(None)` or an empty collection, and `Err` is reserved for a store
/// that cannot answer at all.
pub trait CatalogStore: Send + Sync {
    /// Lookup by primary key
    fn entry_by_key(&self, key: &str) -> Result<Option<CatalogEntry>>;

    /// Lookup by slug (exact)
    fn entry_by_slug(&self, slug: &str) -> Result<Option<CatalogEntry>>;

    /// Lookup by secondary code (exact)
    fn entry_by_code(&self, code: &str) -> Result<Option<CatalogEntry>>;

    /// Bulk listing of every entry, projected to its headline, in key order
    fn list_headlines(&self) -> Result<Vec<EntryHeadline>>;

    /// Entries carrying all (`match_all`) or any of the given tags, at most `limit`
    fn entries_with_tags(
        &self,
        tags: &[String],
        match_all: bool,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>>;

    /// Transcript segments of an entry sorted by start offset.
    ///
    /// With an episode, only that episode; without, every episode in order.
    fn transcript(&self, key: &str, episode: Option<Episode>) -> Result<Vec<TranscriptSegment>>;

    /// Every precomputed entry-level embedding, in key order
    fn entry_embeddings(&self) -> Result<Vec<EntryEmbedding>>;

    /// Segments of an entry that carry an embedding, optionally one episode
    fn segment_embeddings(
        &self,
        key: &str,
        episode: Option<Episode>,
    ) -> Result<Vec<TranscriptSegment>>;

    /// Highest episode with transcript data
    fn latest_episode(&self, key: &str) -> Result<Option<Episode>>;
}

impl CatalogStore for CatalogIndex {
    fn entry_by_key(&self, key: &str) -> Result<Option<CatalogEntry>> {
        Ok(self.get_entry(key).cloned())
    }

    fn entry_by_slug(&self, slug: &str) -> Result<Option<CatalogEntry>> {
        Ok(self.get_by_slug(slug).cloned())
    }

    fn entry_by_code(&self, code: &str) -> Result<Option<CatalogEntry>> {
        Ok(self.get_by_code(code).cloned())
    }

    fn list_headlines(&self) -> Result<Vec<EntryHeadline>> {
        Ok(self.entries().map(CatalogEntry::headline).collect())
    }

    fn entries_with_tags(
        &self,
        tags: &[String],
        match_all: bool,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>> {
        Ok(self
            .entries()
            .filter(|e| e.has_tags(tags, match_all))
            .take(limit)
            .cloned()
            .collect())
    }

    fn transcript(&self, key: &str, episode: Option<Episode>) -> Result<Vec<TranscriptSegment>> {
        Ok(match episode {
            Some(ep) => self.get_episode_segments(key, ep).to_vec(),
            None => self.get_all_segments(key).into_iter().cloned().collect(),
        })
    }

    fn entry_embeddings(&self) -> Result<Vec<EntryEmbedding>> {
        Ok(self
            .entry_embeddings
            .iter()
            .map(|(key, vector)| EntryEmbedding {
                movie_key: key.clone(),
                vector: vector.clone(),
            })
            .collect())
    }

    fn segment_embeddings(
        &self,
        key: &str,
        episode: Option<Episode>,
    ) -> Result<Vec<TranscriptSegment>> {
        Ok(self
            .transcript(key, episode)?
            .into_iter()
            .filter(|s| !s.embedding.is_empty())
            .collect())
    }

    fn latest_episode(&self, key: &str) -> Result<Option<Episode>> {
        Ok(self.get_latest_episode(key))
    }
}
