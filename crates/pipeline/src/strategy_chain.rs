//! The StrategyChain tries answering tiers in order.
//!
//! This module provides the StrategyChain struct that chains answering
//! strategies together using the builder pattern.

use crate::prompts::BUSY_MESSAGE;
use crate::traits::AnswerStrategy;
use crate::turn::{Answer, PendingClarification, Turn};
use tracing;

/// Result of running the whole chain; there is always an answer
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    pub answer: Answer,
    pub clarification: Option<PendingClarification>,
    /// Name of the tier that answered; `None` for the fallback message
    pub answered_by: Option<String>,
}

/// Chains answering tiers into an ordered fallback list.
///
/// ## Usage
/// ```ignore
/// let chain = StrategyChain::new()
///     .add_strategy(PlannerLoop::new(registry.clone(), model.clone()))
///     .add_strategy(LegacyPipeline::new(store, resolver, model, embedder));
///
/// let outcome = chain.run(&turn).await;
/// ```
pub struct StrategyChain {
    strategies: Vec<Box<dyn AnswerStrategy>>,
    fallback: String,
}

impl StrategyChain {
    /// Create a new empty StrategyChain.
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
            fallback: BUSY_MESSAGE.to_string(),
        }
    }

    /// Add a tier to the end of the chain (builder pattern).
    ///
    /// # Arguments
    /// * `strategy` - Any type implementing the AnswerStrategy trait
    ///
    /// # Returns
    /// Self for method chaining
    pub fn add_strategy(mut self, strategy: impl AnswerStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Replace the message returned when no tier answers
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = text.into();
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Run the tiers in order until one answers.
    ///
    /// ## Algorithm
    /// 1. For each tier in order:
    ///    a. Ask it for an outcome; a failing tier is logged and skipped
    ///    b. Keep its pending clarification (a later one replaces an earlier one)
    ///    c. Stop at the first non-blank answer
    /// 2. If no tier answered, return the fallback message
    ///
    /// # Arguments
    /// * `turn` - The question and its conversation hints
    ///
    /// # Returns
    /// The winning answer together with any pending clarification
    pub async fn run(&self, turn: &Turn) -> ChainOutcome {
        let mut clarification = None;
        for strategy in &self.strategies {
            tracing::debug!("Trying strategy: {}", strategy.name());
            let outcome = match strategy.answer(turn).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(strategy = strategy.name(), error = ?e, "strategy failed");
                    continue;
                }
            };

            if outcome.clarification.is_some() {
                clarification = outcome.clarification;
            }
            match outcome.answer {
                Some(answer) if !answer.text.trim().is_empty() => {
                    tracing::debug!("Strategy answered: {}", strategy.name());
                    return ChainOutcome {
                        answer,
                        clarification,
                        answered_by: Some(strategy.name().to_string()),
                    };
                }
                _ => tracing::debug!("Strategy passed: {}", strategy.name()),
            }
        }

        ChainOutcome {
            answer: Answer::fixed(self.fallback.clone()),
            clarification,
            answered_by: None,
        }
    }
}

impl Default for StrategyChain {
    fn default() -> Self {
        Self::new()
    }
}
