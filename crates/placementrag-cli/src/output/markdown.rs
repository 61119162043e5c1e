//! Markdown output formatter

use super::stipend;
use placementrag_core::{AgentResponse, FactsStats, MetricsSnapshot, SemanticStats};

pub fn format_response(
    response: &AgentResponse,
    metrics: Option<&MetricsSnapshot>,
    verbose: bool,
) -> String {
    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", response.plan.original_query));
    output.push_str(response.answer.trim());
    output.push('\n');

    if !verbose {
        return output;
    }

    output.push_str("\n## Trace\n\n");
    output.push_str("| Field | Value |\n|---|---|\n");
    output.push_str(&format!("| Intent | {} |\n", response.plan.intent));
    output.push_str(&format!(
        "| Tools | {} |\n",
        response.plan.tool_names().join(", ")
    ));
    output.push_str(&format!(
        "| Companies | {} |\n",
        response.plan.companies().join(", ")
    ));
    output.push_str(&format!(
        "| Confidence | {:.2} |\n",
        response.feedback.confidence_score
    ));
    output.push_str(&format!("| Retries | {} |\n", response.retries));
    output.push_str(&format!("| Reasoning | {} |\n", response.plan.reasoning));

    if !response.execution.errors.is_empty() {
        output.push_str("\n### Errors\n\n");
        for error in &response.execution.errors {
            output.push_str(&format!("- {}\n", error));
        }
    }

    if let Some(m) = metrics {
        output.push_str("\n### LLM\n\n");
        output.push_str(&format!("- **Requests**: {}\n", m.total_requests));
        output.push_str(&format!("- **Errors**: {}\n", m.total_errors));
        output.push_str(&format!("- **Cache hit rate**: {:.1}%\n", m.cache_hit_rate));
        output.push_str(&format!("- **Avg latency**: {:.0}ms\n", m.avg_latency_ms));
    }

    output
}

pub fn format_companies(companies: &[String]) -> String {
    let mut output = format!("# Companies ({})\n\n", companies.len());
    for company in companies {
        output.push_str(&format!("- {}\n", company));
    }
    if companies.is_empty() {
        output.push_str("*No companies found*\n");
    }
    output
}

pub fn format_status(facts: &FactsStats, semantic: &SemanticStats) -> String {
    let mut output = String::from("# Status\n\n## Facts\n\n");
    output.push_str(&format!("- **Roles**: {}\n", facts.total_entries));
    output.push_str(&format!("- **Companies**: {}\n", facts.total_companies));
    output.push_str(&format!(
        "- **Stipend**: min {}, max {}, avg {}\n",
        stipend(facts.min_stipend),
        stipend(facts.max_stipend),
        stipend(facts.avg_stipend)
    ));
    if !facts.locations.is_empty() {
        output.push_str("\n| Location | Roles |\n|---|---|\n");
        for (location, count) in &facts.locations {
            output.push_str(&format!("| {} | {} |\n", location, count));
        }
    }

    output.push_str("\n## Semantic\n\n");
    output.push_str(&format!("- **Chunks**: {}\n", semantic.total_chunks));
    output.push_str(&format!("- **Companies**: {}\n", semantic.total_companies));
    output.push_str(&format!(
        "- **Model**: {} ({} dims)\n",
        semantic.model, semantic.dimensions
    ));
    if !semantic.chunks_by_type.is_empty() {
        output.push_str("\n| Category | Chunks |\n|---|---|\n");
        for (chunk_type, count) in &semantic.chunks_by_type {
            output.push_str(&format!("| {} | {} |\n", chunk_type, count));
        }
    }
    output
}
