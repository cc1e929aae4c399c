//! Inference client for communicating with the generation/embedding sidecar.
//!
//! This crate defines the two model capabilities the assistant consumes,
//! [`LanguageModel`] and [`Embedder`], and a gRPC implementation of both
//! ([`InferenceClient`]). It handles:
//! - Connection management to the sidecar
//! - Prompt budgeting for small-context (constrained) backends
//! - Error mapping into [`MLClientError`]
//!
//! [`testing`] carries deterministic doubles for tests and offline runs.

pub mod budget;
pub mod client;
pub mod config;
pub mod error;
pub mod proto;
pub mod testing;
pub mod traits;

pub use client::InferenceClient;
pub use config::{GenerationConfig, InferenceConfig, ModelBackend};
pub use error::MLClientError;
pub use traits::{Embedder, LanguageModel};
