//! Assistant configuration, loaded from an optional TOML file.
//!
//! Every section and key is optional; anything left out keeps its default.
//!
//! ```toml
//! [inference]
//! addr = "http://localhost:50051"
//! backend = "constrained"
//!
//! [resolver]
//! match_threshold = 80.0
//!
//! [planner]
//! max_steps = 6
//! ```

use crate::memory::MemoryConfig;
use anyhow::{Context, Result};
use ml_client::InferenceConfig;
use pipeline::{LegacyConfig, PlannerConfig, SummarizerConfig};
use retrieval::ResolverConfig;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub inference: InferenceConfig,
    pub resolver: ResolverConfig,
    pub planner: PlannerConfig,
    pub summarizer: SummarizerConfig,
    pub legacy: LegacyConfig,
    pub memory: MemoryConfig,
}

impl AssistantConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid assistant config")
    }

    /// Load from `path`, or use the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("In {}", path.display()))
    }
}
