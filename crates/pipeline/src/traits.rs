//! Core trait for the answering tiers.
//!
//! This module defines the AnswerStrategy trait that lets the planner and
//! the deterministic fallback be chained behind one contract.

use crate::turn::{StrategyOutcome, Turn};
use anyhow::Result;
use async_trait::async_trait;

/// One tier of the answering chain.
///
/// All tiers must implement this trait to be used in the StrategyChain.
///
/// ## Design Note
/// - `Send + Sync` allows one chain to serve concurrent sessions
/// - A tier that has nothing to say returns an outcome without an answer;
///   `Err` is reserved for faults (store outages), which the chain logs
///   and steps over
#[async_trait]
pub trait AnswerStrategy: Send + Sync {
    /// Returns the name of this tier (for logging/debugging)
    fn name(&self) -> &str;

    /// Try to answer one question.
    ///
    /// # Arguments
    /// * `turn` - The question plus its conversation hints
    ///
    /// # Returns
    /// * `Ok(StrategyOutcome)` - An answer, a pending clarification, both or neither
    /// * `Err` - If the tier could not run at all
    async fn answer(&self, turn: &Turn) -> Result<StrategyOutcome>;
}
