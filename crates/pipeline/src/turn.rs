//! Per-question input and the outcome every answering tier returns.

use catalog::Episode;
use retrieval::MovieBrief;

/// One user question with the hints the conversation carries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Turn {
    pub question: String,
    /// Movie the user is currently looking at (or picked from a clarification)
    pub current_slug: Option<String>,
    pub current_episode: Option<Episode>,
    /// Normalized session id, for logging
    pub session_id: String,
    /// Rendered session memory, empty for a fresh session
    pub session_context: String,
}

impl Turn {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn with_slug(mut self, slug: Option<String>) -> Self {
        self.current_slug = slug.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_episode(mut self, episode: Option<Episode>) -> Self {
        self.current_episode = episode;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>, context: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self.session_context = context.into();
        self
    }
}

/// How an answer came about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    /// Written by the language model
    Generated,
    /// A numbered list asking the user to pick a movie
    Clarification,
    /// One of the fixed messages (not recognized, no data, busy)
    Fixed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub kind: AnswerKind,
}

impl Answer {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: AnswerKind::Generated,
        }
    }

    pub fn clarification(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: AnswerKind::Clarification,
        }
    }

    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: AnswerKind::Fixed,
        }
    }

    /// Whether this answer belongs in session memory
    pub fn is_remembered(&self) -> bool {
        self.kind != AnswerKind::Clarification
    }
}

/// Candidates offered to the user, waiting for a "1"/"2"/"3" reply
#[derive(Debug, Clone, PartialEq)]
pub struct PendingClarification {
    /// Highest-ranked first
    pub candidates: Vec<MovieBrief>,
    /// The question that triggered the clarification
    pub question: String,
}

impl PendingClarification {
    /// Candidate for a 1-based pick, if in range
    pub fn pick(&self, position: usize) -> Option<&MovieBrief> {
        position
            .checked_sub(1)
            .and_then(|idx| self.candidates.get(idx))
    }
}

/// What one tier produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyOutcome {
    pub answer: Option<Answer>,
    pub clarification: Option<PendingClarification>,
}

impl StrategyOutcome {
    pub fn unanswered() -> Self {
        Self::default()
    }

    pub fn answered(answer: Answer) -> Self {
        Self {
            answer: Some(answer),
            clarification: None,
        }
    }

    pub fn with_clarification(mut self, pending: Option<PendingClarification>) -> Self {
        self.clarification = pending;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{CatalogEntry, EntryKind};

    #[test]
    fn test_pick_is_one_based() {
        let pending = PendingClarification {
            candidates: vec![
                MovieBrief::from(&CatalogEntry::new("a", "a", "A", EntryKind::Single)),
                MovieBrief::from(&CatalogEntry::new("b", "b", "B", EntryKind::Single)),
            ],
            question: "q".into(),
        };
        assert_eq!(pending.pick(2).map(|b| b.slug.as_str()), Some("b"));
        assert!(pending.pick(0).is_none());
        assert!(pending.pick(3).is_none());
    }

    #[test]
    fn test_blank_slug_is_dropped() {
        let turn = Turn::new("q").with_slug(Some("  ".into()));
        assert!(turn.current_slug.is_none());
        assert!(!Answer::clarification("x").is_remembered());
        assert!(Answer::fixed("x").is_remembered());
    }
}
