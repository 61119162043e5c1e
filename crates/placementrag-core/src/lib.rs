//! Placementrag Core Library
//!
//! Question answering over internship and placement postings.
//!
//! # Features
//! - Read-only facts store with stipend, CGPA, location and branch filters
//! - Semantic chunk store with ANN search above 1000 chunks
//! - Planner, critic and synthesizer backed by an injected LLM, each with a
//!   rule-based fallback
//! - Bounded retry loop that coarsens weak plans to hybrid search

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod store;
pub mod text;
pub mod tools;

#[cfg(test)]
mod testing;

pub use agent::{AgentResponse, CriticFeedback, ExecutionResult, Intent, PlacementAgent, QueryPlan};
pub use config::{AgentSettings, Config, DataConfig, LLMServiceConfig};
pub use error::{Error, PlacementError, Result};
pub use llm::{AgentLlm, ChatMessage, LLMClient, MetricsSnapshot, VLLMClient};
pub use store::{
    ChunkType, ClientEncoder, FactsIndex, FactsStats, FactsStore, QueryEncoder, RoleRecord,
    SemanticIndex, SemanticStats, SemanticStore,
};
pub use tools::{ToolCall, ToolData, ToolId, ToolResult};

/// Default data directory name
pub const DATA_DIR_NAME: &str = "placementrag";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "placementrag";
