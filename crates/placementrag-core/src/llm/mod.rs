//! LLM integration
//!
//! Provides:
//! - An OpenAI-compatible chat/embedding client with response caching
//! - The injected [`AgentLlm`] handle used by the agent components
//! - Tolerant JSON extraction from model output

mod agent_llm;
mod cache;
mod client;
pub mod json_extract;

pub use agent_llm::{generate_json, generate_text, AgentLlm};
pub use cache::CacheStats;
pub use client::{ChatMessage, LLMClient, MetricsSnapshot, VLLMClient};
pub use json_extract::{extract_json_object, JsonStrategy};
