//! Query pipeline: planner, executor, critic, synthesizer and the
//! orchestrating [`PlacementAgent`]

pub mod critic;
pub mod executor;
mod orchestrator;
mod plan;
pub mod planner;
pub mod synthesizer;

pub use critic::{Critic, CriticFeedback};
pub use executor::{EnrichedCompany, ExecutionResult, Executor};
pub use orchestrator::{AgentResponse, PlacementAgent};
pub use plan::{retry_call, Intent, QueryPlan};
pub use planner::{fallback_plan, Planner};
pub use synthesizer::Synthesizer;
