//! Terminal output formatter

use super::stipend;
use placementrag_core::{AgentResponse, FactsStats, MetricsSnapshot, SemanticStats};
use std::io::{IsTerminal, Write};
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

fn writer() -> BufferWriter {
    let choice = if std::io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    BufferWriter::stdout(choice)
}

fn label(buf: &mut Buffer, name: &str, value: impl std::fmt::Display) -> std::io::Result<()> {
    buf.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
    write!(buf, "  {:<12}", name)?;
    buf.reset()?;
    writeln!(buf, "{}", value)
}

pub fn print_response(
    response: &AgentResponse,
    metrics: Option<&MetricsSnapshot>,
    verbose: bool,
) -> std::io::Result<()> {
    let writer = writer();
    let mut buf = writer.buffer();

    writeln!(buf, "{}", response.answer.trim())?;

    if verbose {
        writeln!(buf)?;
        buf.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(buf, "Trace")?;
        buf.reset()?;

        let plan = &response.plan;
        label(&mut buf, "Intent:", &plan.intent)?;
        label(&mut buf, "Tools:", plan.tool_names().join(", "))?;
        label(&mut buf, "Companies:", plan.companies().join(", "))?;

        let confidence = response.feedback.confidence_score;
        let color = if response.feedback.needs_retry {
            Color::Red
        } else if confidence >= 0.8 {
            Color::Green
        } else {
            Color::Yellow
        };
        buf.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(buf, "  {:<12}", "Confidence:")?;
        buf.set_color(ColorSpec::new().set_fg(Some(color)))?;
        writeln!(buf, "{:.2}", confidence)?;
        buf.reset()?;

        label(&mut buf, "Retries:", response.retries)?;
        label(&mut buf, "Reasoning:", &plan.reasoning)?;

        for error in &response.execution.errors {
            buf.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            writeln!(buf, "  error: {}", error)?;
            buf.reset()?;
        }

        if let Some(m) = metrics {
            label(
                &mut buf,
                "LLM:",
                format!(
                    "{} requests, {} errors, {:.1}% cache hits, {:.0}ms avg",
                    m.total_requests, m.total_errors, m.cache_hit_rate, m.avg_latency_ms
                ),
            )?;
        }
    }

    writer.print(&buf)
}

pub fn format_companies(companies: &[String]) -> String {
    let mut output = String::new();
    for (i, company) in companies.iter().enumerate() {
        output.push_str(&format!("{:>3}. {}\n", i + 1, company));
    }
    output.push_str(&format!("\n{} companies\n", companies.len()));
    output
}

pub fn format_status(facts: &FactsStats, semantic: &SemanticStats) -> String {
    let mut output = String::new();
    output.push_str("Facts:\n");
    output.push_str(&format!("  Roles:         {}\n", facts.total_entries));
    output.push_str(&format!("  Companies:     {}\n", facts.total_companies));
    output.push_str(&format!("  Min stipend:   {}\n", stipend(facts.min_stipend)));
    output.push_str(&format!("  Max stipend:   {}\n", stipend(facts.max_stipend)));
    output.push_str(&format!("  Avg stipend:   {}\n", stipend(facts.avg_stipend)));
    if !facts.locations.is_empty() {
        output.push_str("  Locations:\n");
        for (location, count) in &facts.locations {
            output.push_str(&format!("    {:<18} {}\n", location, count));
        }
    }

    output.push('\n');
    output.push_str("Semantic:\n");
    output.push_str(&format!("  Chunks:        {}\n", semantic.total_chunks));
    output.push_str(&format!("  Companies:     {}\n", semantic.total_companies));
    output.push_str(&format!("  Model:         {}\n", semantic.model));
    output.push_str(&format!("  Dimensions:    {}\n", semantic.dimensions));
    output.push_str(&format!(
        "  ANN index:     {}\n",
        if semantic.ann_index { "yes" } else { "no" }
    ));
    if !semantic.chunks_by_type.is_empty() {
        output.push_str("  By category:\n");
        for (chunk_type, count) in &semantic.chunks_by_type {
            output.push_str(&format!("    {:<24} {}\n", chunk_type, count));
        }
    }
    output
}
