//! Output formatters

pub mod json;
pub mod markdown;
pub mod terminal;

use crate::app::OutputFormat;
use anyhow::Result;
use placementrag_core::{AgentResponse, FactsStats, MetricsSnapshot, SemanticStats};

/// Print an answer, with the pipeline trace when `verbose`
pub fn print_response(
    response: &AgentResponse,
    metrics: Option<&MetricsSnapshot>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    match format {
        OutputFormat::Json => print!("{}", json::format_response(response, metrics, verbose)?),
        OutputFormat::Md => print!("{}", markdown::format_response(response, metrics, verbose)),
        OutputFormat::Cli => terminal::print_response(response, metrics, verbose)?,
    }
    Ok(())
}

pub fn format_companies(companies: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_companies(companies),
        OutputFormat::Md => markdown::format_companies(companies),
        OutputFormat::Cli => terminal::format_companies(companies),
    }
}

pub fn format_status(
    facts: &FactsStats,
    semantic: &SemanticStats,
    format: OutputFormat,
) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => json::format_status(facts, semantic)?,
        OutputFormat::Md => markdown::format_status(facts, semantic),
        OutputFormat::Cli => terminal::format_status(facts, semantic),
    })
}

fn stipend(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("₹{:.0}", v))
}
