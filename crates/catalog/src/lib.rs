//! # Catalog Crate
//!
//! This crate holds the movie catalog the assistant answers questions about.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (CatalogEntry, TranscriptSegment, EntryEmbedding, CatalogIndex)
//! - **parser**: Decode the JSON export into Rust structs
//! - **index**: Load an export directory and validate it
//! - **store**: The read-only `CatalogStore` capability, implemented by `CatalogIndex`
//! - **error**: Error types for loading and querying
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{CatalogIndex, CatalogStore};
//! use std::path::Path;
//!
//! let index = CatalogIndex::load_from_dir(Path::new("data/catalog"))?;
//! let entry = index.entry_by_slug("doraemon")?;
//! let transcript = index.transcript(&entry.unwrap().key, Some(5))?;
//! ```

pub mod error;
pub mod index;
pub mod parser;
pub mod store;
pub mod types;

pub use error::{CatalogError, Result};
pub use store::CatalogStore;
pub use types::{
    CatalogEntry, CatalogIndex, EntryEmbedding, EntryHeadline, EntryKey, EntryKind, Episode,
    TranscriptSegment, movie_link,
};
