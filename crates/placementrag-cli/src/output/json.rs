//! JSON output formatter

use anyhow::Result;
use placementrag_core::{AgentResponse, FactsStats, MetricsSnapshot, SemanticStats};

/// The full response; `verbose` adds LLM metrics alongside it
pub fn format_response(
    response: &AgentResponse,
    metrics: Option<&MetricsSnapshot>,
    verbose: bool,
) -> Result<String> {
    let output = match metrics.filter(|_| verbose) {
        Some(metrics) => serde_json::to_string_pretty(&serde_json::json!({
            "response": response,
            "metrics": metrics,
        }))?,
        None => serde_json::to_string_pretty(response)?,
    };
    Ok(output + "\n")
}

pub fn format_companies(companies: &[String]) -> String {
    serde_json::to_string_pretty(companies).unwrap_or_else(|_| "[]".to_string()) + "\n"
}

pub fn format_status(facts: &FactsStats, semantic: &SemanticStats) -> Result<String> {
    let output = serde_json::json!({
        "facts": facts,
        "semantic": semantic,
    });
    Ok(serde_json::to_string_pretty(&output)? + "\n")
}
