//! Rolling per-session memory fed back into prompts.
//!
//! Every budget is in characters and every stored string respects it:
//! overlong text keeps its beginning and ends with `...`.

use retrieval::truncate_chars;
use serde::Deserialize;

/// Session id used when the caller sends none
pub const ANONYMOUS_SESSION: &str = "anonymous";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Budget of the rolling summary of past questions
    pub summary_max_chars: usize,
    /// Budget of the remembered last question and last answer
    pub turn_max_chars: usize,
    pub session_id_max_chars: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            summary_max_chars: 220,
            turn_max_chars: 180,
            session_id_max_chars: 64,
        }
    }
}

impl MemoryConfig {
    pub fn with_summary_max_chars(mut self, max_chars: usize) -> Self {
        self.summary_max_chars = max_chars;
        self
    }

    pub fn with_turn_max_chars(mut self, max_chars: usize) -> Self {
        self.turn_max_chars = max_chars;
        self
    }
}

/// Trim and cap a caller-supplied session id; blank means anonymous
pub fn normalize_session_id(id: Option<&str>, max_chars: usize) -> String {
    let trimmed = id.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return ANONYMOUS_SESSION.to_string();
    }
    trimmed.chars().take(max_chars.max(1)).collect()
}

/// What one session remembers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionMemory {
    summary: String,
    last_question: String,
    last_answer: String,
}

impl SessionMemory {
    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn last_question(&self) -> &str {
        &self.last_question
    }

    pub fn last_answer(&self) -> &str {
        &self.last_answer
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.last_question.is_empty() && self.last_answer.is_empty()
    }

    /// Two-line rendering for prompts, empty when nothing is remembered
    pub fn context(&self) -> String {
        let mut lines = Vec::with_capacity(2);
        if !self.summary.is_empty() {
            lines.push(format!("Tóm tắt ngắn: {}", self.summary));
        }
        if !self.last_question.is_empty() || !self.last_answer.is_empty() {
            lines.push(format!(
                "Lượt trước: U: {} | A: {}",
                self.last_question, self.last_answer
            ));
        }
        lines.join("\n")
    }

    /// Record one finished turn
    pub fn update(&mut self, question: &str, answer: &str, config: &MemoryConfig) {
        let snippet = truncate_chars(question, config.summary_max_chars);
        let summary = if self.summary.is_empty() {
            snippet
        } else {
            format!("{} | {}", self.summary, snippet)
        };
        self.summary = truncate_chars(&summary, config.summary_max_chars);
        self.last_question = truncate_chars(question, config.turn_max_chars);
        self.last_answer = truncate_chars(answer, config.turn_max_chars);
    }
}
