//! Answer synthesis from retrieved evidence
//!
//! Aggregation answers are always rendered deterministically so counts are
//! exact. Other intents go through the LLM with a rule-based renderer as the
//! fallback for failures and too-short answers.

use super::critic::CriticFeedback;
use super::executor::{EnrichedCompany, ExecutionResult};
use super::plan::{Intent, QueryPlan};
use crate::llm::AgentLlm;
use crate::store::{ChunkType, RoleRecord};
use crate::text::{humanize, title_case, truncate_chars};
use crate::tools::ToolData;
use tracing::{debug, warn};

pub const SYSTEM_PROMPT: &str = "You are a helpful placement information assistant.

CRITICAL RULES:
1. ONLY use data provided - NEVER make up information
2. If data is missing, say \"Not available in database\"
3. Use INR (₹) for currency
4. Format clearly with sections and bullet points
5. Be concise but complete";

const COMPANY_LIST_LIMIT: usize = 25;
const MATCH_LIST_LIMIT: usize = 20;
const BRANCH_LIMIT: usize = 5;
const PASSAGE_PREVIEW_CHARS: usize = 200;

/// Per-section character caps for the LLM context
const CONTEXT_SECTIONS: [(ChunkType, &str, usize); 4] = [
    (ChunkType::InterviewProcess, "INTERVIEW/SELECTION PROCESS", 2000),
    (ChunkType::SkillsRequired, "SKILLS REQUIRED", 1500),
    (ChunkType::RolesResponsibilities, "JOB RESPONSIBILITIES", 1000),
    (ChunkType::AboutCompany, "ABOUT COMPANY", 800),
];

const FALLBACK_SELECTION_CHARS: usize = 1500;
const FALLBACK_SKILLS_CHARS: usize = 1000;

pub struct Synthesizer {
    llm: Option<AgentLlm>,
    min_answer_chars: usize,
}

impl Synthesizer {
    pub fn new(llm: Option<AgentLlm>, min_answer_chars: usize) -> Self {
        Self {
            llm,
            min_answer_chars,
        }
    }

    pub async fn synthesize(
        &self,
        plan: &QueryPlan,
        result: &ExecutionResult,
        feedback: &CriticFeedback,
    ) -> String {
        debug!(
            intent = %plan.intent,
            confidence = feedback.confidence_score,
            "synthesizing answer"
        );

        if plan.intent == Intent::Aggregation {
            return format_aggregation(plan, result);
        }

        if !result.has_enrichment() && result.tool_results.is_empty() {
            return no_data_response(&plan.original_query);
        }

        if let Some(llm) = &self.llm {
            let prompt = build_answer_prompt(&plan.original_query, &build_context(result));
            match llm.generate(SYSTEM_PROMPT, &prompt).await {
                Ok(answer) if answer.trim().chars().count() >= self.min_answer_chars => {
                    return answer.trim().to_string();
                }
                Ok(answer) => warn!(
                    chars = answer.trim().chars().count(),
                    "LLM answer too short, using rule-based answer"
                ),
                Err(e) => warn!("LLM synthesis failed: {}, using rule-based answer", e),
            }
        }

        fallback_answer(plan, result)
    }
}

fn build_answer_prompt(query: &str, context: &str) -> String {
    format!(
        r#"Answer the user's question using ONLY the provided data.

**USER QUESTION:** {}

**AVAILABLE DATA:**
{}

**INSTRUCTIONS:**
1. Answer the specific question asked
2. ONLY use information from the data above - do NOT add anything
3. If asking about selection/interview process, use INTERVIEW/SELECTION section
4. If asking about skills, use SKILLS section
5. For stipend/salary, use FACTS section
6. Format with clear sections and bullet points
7. If information is not in the data, say "Not available in database"

**YOUR RESPONSE:**"#,
        query, context
    )
}

pub fn no_data_response(query: &str) -> String {
    format!(
        "**No information found**\n\nQuery: \"{}\"\n\nTry: Check spelling or use 'companies' to see available companies.",
        query
    )
}

fn stipend_amount(record: &RoleRecord) -> Option<&str> {
    record
        .stipend_salary
        .as_ref()
        .and_then(|s| s.amount.as_deref())
        .map(str::trim)
        .filter(|a| !a.is_empty())
}

fn has_role(record: &RoleRecord) -> bool {
    !record.role_title.trim().is_empty() || !record.role_name.trim().is_empty()
}

/// `• **Company** - Role | ₹amount/month`
fn match_line(record: &RoleRecord) -> String {
    let mut line = format!("• **{}**", record.company_name);
    if has_role(record) {
        line.push_str(&format!(" - {}", record.role()));
    }
    if let Some(amount) = stipend_amount(record) {
        line.push_str(&format!(" | ₹{}/month", amount));
    }
    line
}

fn push_overflow(parts: &mut Vec<String>, total: usize, shown: usize) {
    if total > shown {
        parts.push(format!("\n... and {} more", total - shown));
    }
}

fn push_bullets<T>(
    parts: &mut Vec<String>,
    header: String,
    items: &[T],
    limit: usize,
    line: impl Fn(&T) -> String,
) {
    parts.push(header);
    parts.push(String::new());
    parts.extend(items.iter().take(limit).map(line));
    push_overflow(parts, items.len(), limit);
}

fn push_numbered(parts: &mut Vec<String>, header: String, names: &[String]) {
    parts.push(header);
    parts.push(String::new());
    parts.extend(
        names
            .iter()
            .take(COMPANY_LIST_LIMIT)
            .enumerate()
            .map(|(i, name)| format!("{}. {}", i + 1, name)),
    );
    push_overflow(parts, names.len(), COMPANY_LIST_LIMIT);
}

fn render_aggregate(data: &ToolData, parts: &mut Vec<String>) {
    match data {
        ToolData::Companies { companies } => {
            push_numbered(parts, format!("**Found {} companies:**", companies.len()), companies);
        }
        ToolData::Matches { criterion, results } => push_bullets(
            parts,
            format!("**{} companies matching {}:**", results.len(), criterion),
            results,
            MATCH_LIST_LIMIT,
            match_line,
        ),
        ToolData::Roles { company, roles } => push_bullets(
            parts,
            format!("**{} roles at {}:**", roles.len(), company),
            roles,
            MATCH_LIST_LIMIT,
            match_line,
        ),
        ToolData::Stipends { stipends } => push_bullets(
            parts,
            format!("**Stipends for {} roles:**", stipends.len()),
            stipends,
            MATCH_LIST_LIMIT,
            |s| match s.stipend.as_deref().filter(|a| !a.trim().is_empty()) {
                Some(amount) => format!("• **{}** - {} | ₹{}", s.company, s.role, amount),
                None => format!("• **{}** - {} | N/A", s.company, s.role),
            },
        ),
        ToolData::Attribute { attribute, values } => push_bullets(
            parts,
            format!("**{} for {} roles:**", humanize(attribute), values.len()),
            values,
            MATCH_LIST_LIMIT,
            |v| {
                let value = match &v.value {
                    serde_json::Value::Null => "N/A".to_string(),
                    serde_json::Value::String(s) if s.trim().is_empty() => "N/A".to_string(),
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!("• **{}** - {}: {}", v.company, v.role, value)
            },
        ),
        ToolData::Hybrid(hybrid) => {
            let names: Vec<String> = hybrid.companies.iter().map(|c| title_case(c)).collect();
            push_numbered(parts, format!("**Found {} companies:**", names.len()), &names);
        }
        ToolData::Semantic { results, .. } => push_bullets(
            parts,
            format!("**{} relevant passages:**", results.len()),
            results,
            MATCH_LIST_LIMIT,
            |h| {
                format!(
                    "• **{}** ({}): {}",
                    h.company,
                    h.chunk_type,
                    truncate_chars(&h.text, PASSAGE_PREVIEW_CHARS)
                )
            },
        ),
        ToolData::Ranking(ranking) => {
            let order = if ranking.descending {
                "highest first"
            } else {
                "lowest first"
            };
            push_bullets(
                parts,
                format!("**Companies ranked by {} ({}):**", ranking.ranked_by, order),
                &ranking.entries,
                MATCH_LIST_LIMIT,
                |e| format!("{}. **{}** - {}: {}", e.rank, e.company, e.role, e.value),
            );
        }
        ToolData::BestFor(best) => {
            parts.push(format!(
                "**Best company: {}** (based on {})",
                best.best.as_deref().unwrap_or("N/A"),
                best.criteria.join(", ")
            ));
            parts.extend(
                best.scores
                    .iter()
                    .map(|s| format!("• **{}** - score {:.2}", s.company, s.score)),
            );
        }
        ToolData::ComparisonTable(table) => {
            parts.push(format!("```\n{}\n```", table.table));
        }
        ToolData::ComparisonDetail { profiles } => {
            for profile in profiles {
                parts.push(format!("**{}**", profile.company));
                if let Some(role) = &profile.role {
                    parts.push(format!("- Role: {}", role));
                }
                if let Some(stipend) = &profile.stipend {
                    parts.push(format!("- Stipend: {}", stipend));
                }
                if let Some(cgpa) = &profile.cgpa {
                    parts.push(format!("- Min CGPA: {}", cgpa));
                }
            }
        }
    }
}

/// Deterministic renderer for aggregation intents
pub fn format_aggregation(plan: &QueryPlan, result: &ExecutionResult) -> String {
    let mut parts = Vec::new();
    for data in result.data() {
        render_aggregate(data, &mut parts);
    }

    if parts.is_empty() {
        no_data_response(&plan.original_query)
    } else {
        parts.join("\n")
    }
}

fn push_facts(parts: &mut Vec<String>, facts: &[RoleRecord]) {
    if facts.is_empty() {
        return;
    }
    parts.push("\n### FACTS (Structured Data):".to_string());

    for (i, fact) in facts.iter().enumerate() {
        parts.push(format!("\n**Role {}: {}**", i + 1, fact.role()));

        if let Some(stipend) = fact.stipend_salary.as_ref() {
            if let Some(amount) = stipend_amount(fact) {
                let period = match stipend.period.trim() {
                    "" => "per month",
                    p => p,
                };
                parts.push(format!("- Stipend: ₹{} {}", amount, period));
            }
        }
        if !fact.location.is_empty() {
            parts.push(format!("- Location: {}", fact.locations_joined()));
        }
        if !fact.duration.trim().is_empty() {
            parts.push(format!("- Duration: {}", fact.duration.trim()));
        }
        if let Some(cgpa) = fact.cgpa_requirement() {
            parts.push(format!("- Min CGPA: {}", cgpa));
        }
        let branches = fact.branches();
        if !branches.is_empty() {
            let shown: Vec<&str> = branches
                .iter()
                .take(BRANCH_LIMIT)
                .map(String::as_str)
                .collect();
            parts.push(format!("- Eligible Branches: {}", shown.join(", ")));
        }
    }
}

fn push_company_context(parts: &mut Vec<String>, company: &str, entry: &EnrichedCompany) {
    let rule = "=".repeat(50);
    parts.push(format!("\n{}", rule));
    parts.push(format!("## COMPANY: {}", company.to_uppercase()));
    parts.push(rule);

    push_facts(parts, &entry.facts);

    for (chunk_type, title, limit) in CONTEXT_SECTIONS {
        if let Some(text) = entry.semantic.get(&chunk_type).filter(|t| !t.is_empty()) {
            parts.push(format!("\n### {}:", title));
            parts.push(truncate_chars(text, limit).to_string());
        }
    }
}

fn comparison_tables(result: &ExecutionResult) -> impl Iterator<Item = &str> {
    result.data().filter_map(|data| match data {
        ToolData::ComparisonTable(table) => Some(table.table.as_str()),
        _ => None,
    })
}

/// Evidence handed to the answer LLM
pub fn build_context(result: &ExecutionResult) -> String {
    let mut parts = Vec::new();

    for (company, entry) in result.enriched() {
        push_company_context(&mut parts, company, entry);
    }

    for table in comparison_tables(result) {
        parts.push("\n### COMPARISON TABLE:".to_string());
        parts.push(table.to_string());
    }

    parts.join("\n")
}

/// Rule-based answer used without an LLM or when its answer is unusable
pub fn fallback_answer(plan: &QueryPlan, result: &ExecutionResult) -> String {
    let query = plan.original_query.to_lowercase();
    let wants_selection = ["selection", "interview", "process", "rounds"]
        .iter()
        .any(|kw| query.contains(kw));
    let wants_skills = ["skills", "requirements"].iter().any(|kw| query.contains(kw));

    let mut parts = Vec::new();
    for (company, entry) in result.enriched() {
        parts.push(format!("\n## {}", company.to_uppercase()));

        if !entry.facts.is_empty() {
            parts.push("\n**Roles:**".to_string());
            for fact in &entry.facts {
                match stipend_amount(fact) {
                    Some(amount) => parts.push(format!("- {}: ₹{}/month", fact.role(), amount)),
                    None => parts.push(format!("- {}", fact.role())),
                }
            }
        }

        if wants_selection {
            if let Some(text) = entry.semantic.get(&ChunkType::InterviewProcess) {
                parts.push("\n### Selection Process:".to_string());
                parts.push(truncate_chars(text, FALLBACK_SELECTION_CHARS).to_string());
            }
        }

        if wants_skills {
            if let Some(text) = entry.semantic.get(&ChunkType::SkillsRequired) {
                parts.push("\n### Skills:".to_string());
                parts.push(truncate_chars(text, FALLBACK_SKILLS_CHARS).to_string());
            }
        }
    }

    for table in comparison_tables(result) {
        parts.push(format!("\n```\n{}\n```", table));
    }

    if parts.is_empty() {
        no_data_response(&plan.original_query)
    } else {
        parts.join("\n").trim_start().to_string()
    }
}
