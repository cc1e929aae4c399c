//! Summary vs. detail request classification.

use crate::prompts::classify_prompt;
use ml_client::{LanguageModel, ModelBackend};
use tracing::debug;

/// Phrases that mark a request for an episode summary
pub const SUMMARY_KEYWORDS: &[&str] = &[
    "tóm tắt",
    "nội dung tập",
    "kể lại tập",
    "tập này nói về gì",
    "nói về gì",
    "review tập",
    "tom tat",
    "noi dung tap",
    "ke lai tap",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Retell a whole episode
    Summary,
    /// Answer a specific question from retrieved snippets
    Detail,
}

impl RequestMode {
    pub fn from_keywords(text: &str) -> Self {
        let lower = text.to_lowercase();
        if SUMMARY_KEYWORDS.iter().any(|k| lower.contains(k)) {
            RequestMode::Summary
        } else {
            RequestMode::Detail
        }
    }

    /// Read a one-word model verdict; `None` when it says neither
    pub fn from_model_reply(reply: &str) -> Option<Self> {
        let lower = reply.trim().to_lowercase();
        if lower.contains("summary") {
            Some(RequestMode::Summary)
        } else if lower.contains("detail") {
            Some(RequestMode::Detail)
        } else {
            None
        }
    }
}

/// Classify a request.
///
/// The primary backend is asked for a one-word verdict, with keywords as the
/// fallback; the constrained backend only uses keywords.
pub async fn classify_request(model: &dyn LanguageModel, text: &str) -> RequestMode {
    if text.trim().is_empty() {
        return RequestMode::Detail;
    }
    if model.backend() == ModelBackend::Constrained {
        return RequestMode::from_keywords(text);
    }

    let verdict = model
        .try_generate(&classify_prompt(text), "summary_decider")
        .await
        .and_then(|reply| RequestMode::from_model_reply(&reply));
    debug!(?verdict, "model classification");
    verdict.unwrap_or_else(|| RequestMode::from_keywords(text))
}
