//! Answering tiers, in the order the assistant chains them.

pub mod legacy;
pub mod planner;

pub use legacy::{LegacyConfig, LegacyPipeline};
pub use planner::{PlannerConfig, PlannerLoop, PlannerReport, StopReason};
