//! Episode number detection in free text ("tập 5", "ep 12", "tập thứ 3").

use catalog::Episode;
use regex::Regex;

/// Patterns tried in order; the first capture wins
const EPISODE_PATTERNS: &[&str] = &[
    r"(?i)(?:tập|tap|ep|episode)\s*(\d+)",
    r"(?i)(?:tập|tap)\s*thứ\s*(\d+)",
];

/// Extracts an explicit episode reference from a question
#[derive(Debug, Clone)]
pub struct EpisodeDetector {
    patterns: Vec<Regex>,
}

impl Default for EpisodeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl EpisodeDetector {
    pub fn new() -> Self {
        let patterns = EPISODE_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self { patterns }
    }

    /// First episode number mentioned in `text`, if any
    pub fn detect(&self, text: &str) -> Option<Episode> {
        let lower = text.to_lowercase();
        self.patterns.iter().find_map(|pattern| {
            pattern
                .captures(&lower)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
    }
}
