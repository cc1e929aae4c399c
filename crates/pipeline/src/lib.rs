//! Answering pipeline for catalog questions.
//!
//! This crate provides:
//! - AnswerStrategy trait and the two tiers implementing it
//! - StrategyChain for trying tiers in order
//! - Plan parsing, prompt building and transcript summarization
//!
//! ## Architecture
//! A question passes through the tiers in order until one answers:
//! 1. PlannerLoop lets the language model call retrieval tools step by step
//! 2. LegacyPipeline resolves the movie itself and answers from one prompt
//! 3. If neither answers, the chain returns the busy message
//!
//! Either tier may also leave a pending clarification (a short list of
//! candidate movies) for the caller to keep until the user picks one.
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{LegacyPipeline, PlannerLoop, StrategyChain, Turn};
//!
//! let chain = StrategyChain::new()
//!     .add_strategy(PlannerLoop::new(registry.clone(), model.clone()))
//!     .add_strategy(LegacyPipeline::new(store, resolver, model, embedder));
//!
//! let outcome = chain.run(&Turn::new("doraemon tập 5 nói về gì")).await;
//! println!("{}", outcome.answer.text);
//! ```

pub mod classify;
pub mod history;
pub mod plan;
pub mod prompts;
pub mod strategies;
pub mod strategy_chain;
pub mod summarizer;
pub mod traits;
pub mod turn;

// Re-export main types
pub use classify::{RequestMode, classify_request};
pub use history::{ToolHistory, ToolRecord};
pub use plan::Plan;
pub use strategies::{LegacyConfig, LegacyPipeline, PlannerConfig, PlannerLoop, PlannerReport, StopReason};
pub use strategy_chain::{ChainOutcome, StrategyChain};
pub use summarizer::{SummarizerConfig, TranscriptSummarizer, split_chunks};
pub use traits::AnswerStrategy;
pub use turn::{Answer, AnswerKind, PendingClarification, StrategyOutcome, Turn};
