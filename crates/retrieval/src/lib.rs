//! # Retrieval Crate
//!
//! Deterministic retrieval over the catalog: everything the answering
//! pipeline can look up without asking a language model.
//!
//! ## Components
//!
//! ### CatalogResolver
//! Free-text movie references to catalog entries:
//! - Fuzzy slug/title matching, parallel over the catalog
//! - Ambiguity detection producing a short candidate list
//! - Semantic fallback on entry embeddings
//!
//! ### ToolRegistry
//! The six planner-callable tools, each taking lenient JSON arguments and
//! returning a JSON object, never an error.
//!
//! ### EpisodeDetector
//! Explicit episode references ("tập 5", "ep 12") in questions.
//!
//! ## Example Usage
//!
//! ```ignore
//! use retrieval::{CatalogResolver, Resolution, ToolCall, ToolName, ToolRegistry};
//! use std::sync::Arc;
//!
//! let resolver = CatalogResolver::new(store.clone(), embedder.clone());
//! match resolver.resolve("doraemon tập 5").await {
//!     Resolution::Matched(entry) => println!("{}", entry.title),
//!     Resolution::Ambiguous(candidates) => println!("{} candidates", candidates.len()),
//!     Resolution::NotFound => println!("no idea"),
//! }
//!
//! let registry = ToolRegistry::new(store, embedder);
//! let result = registry.execute_named("find_movie_by_name", &args).await;
//! ```

pub mod brief;
pub mod episode;
pub mod error;
pub mod fuzzy;
pub mod registry;
pub mod resolver;
pub mod text;
pub mod tools;
pub mod vector;

pub use brief::MovieBrief;
pub use episode::EpisodeDetector;
pub use error::ToolError;
pub use registry::{ToolRegistry, render_transcript};
pub use resolver::{CatalogResolver, Resolution, ResolverConfig};
pub use text::{slugify, truncate_chars};
pub use tools::{MovieTarget, ToolCall, ToolName};
