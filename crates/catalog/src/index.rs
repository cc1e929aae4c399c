//! CatalogIndex loading and validation.
//!
//! Builds the in-memory catalog from an export directory:
//! - Parse movies, entry embeddings and transcript segments in parallel
//! - Attach segments to their entries (defaulting single titles to episode 1)
//! - Validate that every embedding and segment points at a known entry

use crate::error::{CatalogError, Result};
use crate::parser;
use crate::types::*;
use std::path::Path;
use tracing::{info, warn};

/// Export file holding the catalog entries (required)
pub const MOVIES_FILE: &str = "movies.json";
/// Export file holding entry-level embeddings (optional)
pub const ENTRY_EMBEDDINGS_FILE: &str = "movie_embeddings.json";
/// Export file holding transcript segments (optional)
pub const SEGMENTS_FILE: &str = "video_vectors.json";

/// Parse an optional export file; a missing file yields no records
fn parse_optional<T>(path: &Path, parse: fn(&Path) -> Result<Vec<T>>) -> Result<Vec<T>> {
    if path.exists() {
        parse(path)
    } else {
        warn!(path = %path.display(), "optional catalog file missing, using empty set");
        Ok(Vec::new())
    }
}

impl CatalogIndex {
    /// Load the catalog export from a directory
    ///
    /// Steps:
    /// 1. Parse the three files (movies, entry embeddings, segments) in parallel
    /// 2. Insert entries, building the slug and code lookups
    /// 3. Convert and insert segments, sorted by start within each episode
    /// 4. Validate references
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        info!(dir = %data_dir.display(), "Loading catalog export");

        let movies_path = data_dir.join(MOVIES_FILE);
        let embeddings_path = data_dir.join(ENTRY_EMBEDDINGS_FILE);
        let segments_path = data_dir.join(SEGMENTS_FILE);

        let ((entries, embeddings), segments) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_entries(&movies_path),
                    || parse_optional(&embeddings_path, parser::parse_entry_embeddings),
                )
            },
            || parse_optional(&segments_path, parser::parse_segments),
        );

        let entries = entries?;
        let embeddings = embeddings?;
        let segments = segments?;

        let mut index = CatalogIndex::new();
        for entry in entries {
            index.insert_entry(entry);
        }
        for embedding in embeddings {
            index.insert_entry_embedding(embedding);
        }

        let mut skipped = 0usize;
        for raw in segments {
            let kind = parser::id_string(&raw.movie_id)
                .and_then(|key| index.get_entry(&key).map(|e| e.kind))
                .unwrap_or(EntryKind::Single);
            match parser::convert_segment(raw, kind) {
                Some(segment) => index.insert_segment(segment),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "dropped transcript segments without a usable movie id or episode");
        }

        index.validate()?;

        let (entries, segments, embeddings) = index.counts();
        info!(entries, segments, embeddings, "Catalog loaded and validated");
        Ok(index)
    }

    /// Validate data integrity
    ///
    /// Check that:
    /// - Every entry-level embedding references a known entry
    /// - Every transcript segment references a known entry
    /// - Entry embeddings all share one dimension
    pub fn validate(&self) -> Result<()> {
        if let Some(key) = self
            .entry_embeddings
            .keys()
            .find(|key| !self.entries.contains_key(*key))
        {
            return Err(CatalogError::MissingReference {
                entity: "EntryEmbedding".to_string(),
                key: key.clone(),
            });
        }

        if let Some(key) = self.segments.keys().find(|key| !self.entries.contains_key(*key)) {
            return Err(CatalogError::MissingReference {
                entity: "TranscriptSegment".to_string(),
                key: key.clone(),
            });
        }

        let mut dims = self
            .entry_embeddings
            .values()
            .map(|v| v.len())
            .filter(|len| *len > 0);
        if let Some(first) = dims.next() {
            if let Some(other) = dims.find(|len| *len != first) {
                return Err(CatalogError::ValidationError(format!(
                    "entry embeddings disagree on dimension ({first} vs {other})"
                )));
            }
        }

        Ok(())
    }
}
