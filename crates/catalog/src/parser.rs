//! Parser for the catalog export files.
//!
//! The export mirrors the document store's collections, one JSON array per file:
//! - movies.json: `{ _id, id, slug, title, year, type, synopsis, cast, director, tags, episodes, ... }`
//! - movie_embeddings.json: `{ movie_id, vector_embedding }`
//! - video_vectors.json: `{ movie_id, episode, start, content, vector_embedding }`
//!
//! Raw records are deserialized leniently (numbers that arrive as strings,
//! missing optional fields) and converted into the domain types.

use crate::error::{CatalogError, Result};
use crate::types::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read a JSON array file into raw records
fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|_| CatalogError::FileNotFound {
        path: path.display().to_string(),
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| CatalogError::ParseError {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Document-store shaped movie record
#[derive(Debug, Deserialize)]
struct RawMovie {
    #[serde(rename = "_id")]
    key: Value,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    year: Option<Value>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    synopsis: String,
    #[serde(default)]
    cast: Vec<String>,
    #[serde(default)]
    director: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    episodes: Vec<Value>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    duration: Option<Value>,
    #[serde(default)]
    rating: Option<f32>,
    #[serde(rename = "seriesStatus", default)]
    series_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntryEmbedding {
    movie_id: Value,
    vector_embedding: Vec<f32>,
}

/// Segment record as exported; `episode` may be missing for single titles
#[derive(Debug, Clone, Deserialize)]
pub struct RawSegment {
    pub movie_id: Value,
    #[serde(default)]
    pub episode: Option<Value>,
    pub start: f64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub vector_embedding: Vec<f32>,
}

/// Ids may be plain strings or `{"$oid": "..."}` objects in the export
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$oid").and_then(id_string),
        _ => None,
    }
}

/// Lenient integer: accepts `5`, `5.0` and `"5"`
pub(crate) fn lenient_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_kind(raw: Option<&str>) -> Result<EntryKind> {
    match raw.unwrap_or("single") {
        "single" | "movie" => Ok(EntryKind::Single),
        "series" => Ok(EntryKind::Series),
        other => Err(CatalogError::InvalidValue {
            field: "type".to_string(),
            value: other.to_string(),
        }),
    }
}

fn convert_movie(raw: RawMovie) -> Result<CatalogEntry> {
    let key = id_string(&raw.key).ok_or_else(|| CatalogError::InvalidValue {
        field: "_id".to_string(),
        value: raw.key.to_string(),
    })?;
    let kind = parse_kind(raw.kind.as_deref())?;
    let episode_count = match kind {
        EntryKind::Series => raw.episodes.len() as u32,
        EntryKind::Single => 1,
    };
    let year = raw
        .year
        .as_ref()
        .and_then(lenient_u32)
        .and_then(|y| u16::try_from(y).ok());
    let duration = raw.duration.map(|d| match d {
        Value::String(s) => s,
        other => other.to_string(),
    });

    Ok(CatalogEntry {
        key,
        code: raw.id.as_ref().and_then(id_string),
        slug: raw.slug,
        title: raw.title,
        year,
        kind,
        synopsis: raw.synopsis,
        cast: raw.cast,
        director: raw.director,
        tags: raw.tags,
        episode_count,
        country: raw.country,
        duration,
        rating: raw.rating,
        series_status: raw.series_status,
    })
}

/// Parse movies.json
pub fn parse_entries(path: &Path) -> Result<Vec<CatalogEntry>> {
    let raw: Vec<RawMovie> = read_json_array(path)?;
    raw.into_iter().map(convert_movie).collect()
}

/// Parse movie_embeddings.json
pub fn parse_entry_embeddings(path: &Path) -> Result<Vec<EntryEmbedding>> {
    let raw: Vec<RawEntryEmbedding> = read_json_array(path)?;
    raw.into_iter()
        .map(|r| {
            let movie_key = id_string(&r.movie_id).ok_or_else(|| CatalogError::InvalidValue {
                field: "movie_id".to_string(),
                value: r.movie_id.to_string(),
            })?;
            Ok(EntryEmbedding {
                movie_key,
                vector: r.vector_embedding,
            })
        })
        .collect()
}

/// Parse video_vectors.json
///
/// Episodes are resolved later, once the owning entry's kind is known.
pub fn parse_segments(path: &Path) -> Result<Vec<RawSegment>> {
    read_json_array(path)
}

/// Turn a raw segment into a domain segment.
///
/// A missing episode defaults to 1 for single titles; series segments
/// without an episode are rejected (`None`).
pub fn convert_segment(raw: RawSegment, kind: EntryKind) -> Option<TranscriptSegment> {
    let movie_key = id_string(&raw.movie_id)?;
    let episode = match raw.episode.as_ref().and_then(lenient_u32) {
        Some(ep) => ep,
        None if kind == EntryKind::Single => 1,
        None => return None,
    };
    Some(TranscriptSegment {
        movie_key,
        episode,
        start: raw.start,
        content: raw.content,
        embedding: raw.vector_embedding,
    })
}
