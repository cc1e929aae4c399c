//! Configuration for the inference client.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which kind of model sits behind the generation service.
///
/// The constrained backend has a small context window: prompts are budgeted
/// against it and the planner gets fewer steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    #[default]
    Primary,
    Constrained,
}

impl ModelBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelBackend::Primary => "primary",
            ModelBackend::Constrained => "constrained",
        }
    }
}

impl fmt::Display for ModelBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "primary" => Ok(ModelBackend::Primary),
            "constrained" | "local" => Ok(ModelBackend::Constrained),
            other => Err(format!("unknown backend '{other}' (expected primary|constrained)")),
        }
    }
}

/// Generation parameters and context-window budgeting
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Context window of the constrained backend, in tokens
    pub context_window: u32,
    /// Tokens kept free on the first attempt
    pub reserve_tokens: u32,
    /// Tokens kept free after the prompt was shrunk
    pub retry_reserve_tokens: u32,
    /// A shrunk prompt never goes below this many chars
    pub min_shrink_chars: usize,
    /// Fraction of the prompt kept when shrinking
    pub shrink_ratio: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_tokens: 1024,
            context_window: 2048,
            reserve_tokens: 128,
            retry_reserve_tokens: 32,
            min_shrink_chars: 400,
            shrink_ratio: 0.6,
        }
    }
}

impl GenerationConfig {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_context_window(mut self, context_window: u32) -> Self {
        self.context_window = context_window;
        self
    }
}

/// Where the inference sidecar lives and how long to wait for it
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Address of the gRPC service (e.g. "http://localhost:50051")
    pub addr: String,
    pub backend: ModelBackend,
    pub timeout_secs: u64,
    pub generation: GenerationConfig,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            addr: "http://localhost:50051".to_string(),
            backend: ModelBackend::Primary,
            timeout_secs: 60,
            generation: GenerationConfig::default(),
        }
    }
}

impl InferenceConfig {
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    pub fn with_backend(mut self, backend: ModelBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
