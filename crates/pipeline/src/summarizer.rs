//! TranscriptSummarizer - map/reduce summaries for small-context models
//!
//! A whole episode rarely fits a constrained backend's window, so the
//! transcript is cut into chunks, each chunk is summarized on its own, and
//! the chunk summaries are merged by one last call.
//!
//! ## Algorithm
//! 1. Keep the non-empty lines; pack them into chunks of at most
//!    `max_chunk_chars` (a line costs its length plus one)
//! 2. Once `max_chunks - 1` chunks are closed, every remaining line goes
//!    into the last chunk, so nothing is dropped
//! 3. Summarize each chunk; failed or blank summaries contribute nothing
//! 4. One summary is returned as is; several are merged by the model, or
//!    joined as bullet lines if the merge fails

use crate::prompts::{chunk_prompt, merge_prompt};
use catalog::Episode;
use ml_client::LanguageModel;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub max_chunk_chars: usize,
    pub max_chunks: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 4800,
            max_chunks: 6,
        }
    }
}

impl SummarizerConfig {
    pub fn with_max_chunk_chars(mut self, max_chunk_chars: usize) -> Self {
        self.max_chunk_chars = max_chunk_chars;
        self
    }

    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks;
        self
    }
}

/// Split text into at most `max_chunks` chunks of whole, non-empty lines.
///
/// Joining the chunks with `\n` gives back the non-empty lines in order.
pub fn split_chunks(text: &str, max_chars: usize, max_chunks: usize) -> Vec<String> {
    let max_chunks = max_chunks.max(1);
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut size = 0;

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let extra = line.chars().count() + 1;
        let can_open = chunks.len() + 1 < max_chunks;
        if size + extra > max_chars && !current.is_empty() && can_open {
            chunks.push(current.join("\n"));
            current.clear();
            size = 0;
        }
        current.push(line);
        size += extra;
    }
    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }
    chunks
}

pub struct TranscriptSummarizer {
    model: Arc<dyn LanguageModel>,
    config: SummarizerConfig,
}

impl TranscriptSummarizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            config: SummarizerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SummarizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Summarize one episode transcript; `None` when nothing could be produced
    #[instrument(skip(self, transcript))]
    pub async fn summarize(&self, transcript: &str, title: &str, episode: Episode) -> Option<String> {
        let chunks = split_chunks(
            transcript,
            self.config.max_chunk_chars,
            self.config.max_chunks,
        );
        if chunks.is_empty() {
            return None;
        }

        let total = chunks.len();
        let mut summaries = Vec::with_capacity(total);
        for (i, chunk) in chunks.iter().enumerate() {
            let prompt = chunk_prompt(i + 1, total, episode, title, chunk);
            if let Some(summary) = self.model.try_generate(&prompt, "summary_chunk").await {
                let summary = summary.trim();
                if !summary.is_empty() {
                    summaries.push(summary.to_string());
                }
            }
        }
        debug!(chunks = total, summaries = summaries.len(), "chunks summarized");

        match summaries.len() {
            0 => None,
            1 => summaries.pop(),
            _ => {
                let merged = summaries
                    .iter()
                    .map(|s| format!("- {s}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                let prompt = merge_prompt(episode, title, &merged);
                match self.model.try_generate(&prompt, "summary_merge").await {
                    Some(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
                    _ => Some(merged),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_client::ModelBackend;
    use ml_client::testing::ScriptedModel;

    fn transcript(lines: usize) -> String {
        (0..lines)
            .map(|i| format!("- [{i}s]: câu thoại số {i}"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn test_split_respects_budget_and_order() {
        let text = transcript(40);
        let chunks = split_chunks(&text, 120, 100);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            let size: usize = chunk.lines().map(|l| l.chars().count() + 1).sum();
            assert!(size <= 120, "chunk too large: {size}");
        }
        let rebuilt: Vec<&str> = chunks.iter().flat_map(|c| c.lines()).collect();
        let original: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_split_folds_overflow_into_last_chunk() {
        let text = transcript(40);
        let chunks = split_chunks(&text, 120, 3);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.join("\n"), text.replace("\n\n", "\n"));
        assert!(chunks[2].ends_with("câu thoại số 39"));
    }

    #[test]
    fn test_split_edge_cases() {
        assert!(split_chunks("", 100, 6).is_empty());
        assert!(split_chunks("  \n\n ", 100, 6).is_empty());

        let long = "x".repeat(500);
        assert_eq!(split_chunks(&long, 100, 6), vec![long.clone()]);
        assert_eq!(split_chunks("a\nb\nc", 2, 0).len(), 1);
    }

    #[tokio::test]
    async fn test_single_chunk_is_returned_verbatim() {
        let model = Arc::new(ScriptedModel::queued(
            ModelBackend::Constrained,
            [Some("  Nobita làm mất bảo bối. ")],
        ));
        let summarizer = TranscriptSummarizer::new(model.clone());

        let summary = summarizer.summarize("- [1s]: a\n- [2s]: b", "Doraemon", 5).await;
        assert_eq!(summary.as_deref(), Some("Nobita làm mất bảo bối."));
        assert_eq!(model.call_count(), 1);
        assert!(model.prompts()[0].contains("đoạn 1/1 của tập 5 phim \"Doraemon\""));
    }

    #[tokio::test]
    async fn test_failed_chunks_and_merge_fallback() {
        let model = Arc::new(ScriptedModel::queued(
            ModelBackend::Constrained,
            [Some("Mở đầu."), None, Some("Kết thúc."), None],
        ));
        let summarizer = TranscriptSummarizer::new(model.clone())
            .with_config(SummarizerConfig::default().with_max_chunk_chars(60));

        let summary = summarizer.summarize(&transcript(6), "Doraemon", 2).await;
        assert_eq!(summary.as_deref(), Some("- Mở đầu.\n- Kết thúc."));
        assert_eq!(model.call_count(), 4);
        assert!(model.prompts()[3].contains("Tóm tắt từng đoạn:\n- Mở đầu.\n- Kết thúc."));
    }

    #[tokio::test]
    async fn test_merge() {
        let model = Arc::new(ScriptedModel::responding(ModelBackend::Constrained, |p| {
            if p.starts_with("Dựa trên") {
                Some("Cả tập.".into())
            } else {
                Some("Một đoạn.".into())
            }
        }));
        let summarizer = TranscriptSummarizer::new(model.clone())
            .with_config(SummarizerConfig::default().with_max_chunk_chars(60));

        let summary = summarizer.summarize(&transcript(6), "Doraemon", 2).await;
        assert_eq!(summary.as_deref(), Some("Cả tập."));
    }

    #[tokio::test]
    async fn test_nothing_to_summarize() {
        let model = Arc::new(ScriptedModel::failing(ModelBackend::Constrained));
        let summarizer = TranscriptSummarizer::new(model.clone());

        assert!(summarizer.summarize("", "X", 1).await.is_none());
        assert!(summarizer.summarize("a\nb", "X", 1).await.is_none());
        assert_eq!(model.call_count(), 1);
    }
}
