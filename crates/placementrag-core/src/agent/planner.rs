//! Query planner: free text to a typed [`QueryPlan`]
//!
//! Company detection is always rule-based. Intent and tool selection go to
//! the LLM when one is configured; any failure on that path (transport,
//! timeout, unparseable or invalid JSON) falls back to [`fallback_plan`].

use super::plan::{Intent, QueryPlan};
use crate::llm::AgentLlm;
use crate::store::{parse_number, ChunkType, MAX_TOP_K};
use crate::tools::{
    CompareParams, CompareType, FactsAction, HybridParams, ToolCall, ToolId,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub const SYSTEM_PROMPT: &str = r#"You are a query planning assistant for a placement/internship information system.

Available tools:
1. **facts_lookup** - For structured data queries:
   - Actions: get_all_companies, get_company_details, get_all_stipends, filter_by_stipend, filter_by_cgpa, filter_by_location, filter_by_branch, get_attribute, get_eligibility, get_selection_process
   - Use for: stipend amounts, CGPA requirements, locations, eligibility, counting/listing companies

2. **semantic_search** - For descriptive information:
   - Search types: about_company, roles_responsibilities, skills_required, interview_process
   - Use for: company culture, job descriptions, skills needed, interview details

3. **compare_companies** - For comparing 2+ companies
   - Use for: side-by-side comparison queries

4. **hybrid_search** - For queries needing BOTH facts AND descriptions
   - Use for: detailed company info, selection process details, comprehensive queries

Analyze the query and decide the best tool(s) to use."#;

/// Known companies shown to the LLM
const PROMPT_COMPANY_LIMIT: usize = 25;

/// Misspellings and short forms mapped to canonical lowercase names
const COMPANY_ALIASES: [(&str, &str); 5] = [
    ("intell", "intel"),
    ("dell", "dell"),
    ("nvidia", "nvidia"),
    ("bosch", "bosch"),
    ("amazon", "amazon"),
];

const CITIES: [(&str, &str); 7] = [
    ("bangalore", "Bangalore"),
    ("hyderabad", "Hyderabad"),
    ("chennai", "Chennai"),
    ("mumbai", "Mumbai"),
    ("delhi", "Delhi"),
    ("pune", "Pune"),
    ("noida", "Noida"),
];

const AGGREGATION_PHRASES: [&str; 5] = [
    "how many",
    "list all",
    "which companies",
    "companies in",
    "companies with",
];

lazy_static! {
    static ref COUNT_RE: Regex = Regex::new(r"\bcount\b").unwrap();
    static ref STIPEND_COMPARATIVE_RE: Regex =
        Regex::new(r"\bstipends?\s+(?:of\s+)?(?:more|greater|above|less|below|under)\b").unwrap();
    static ref CGPA_COMPARATIVE_RE: Regex =
        Regex::new(r"\bcgpa\s+(?:of\s+)?(?:less|below|under|more|above)\b").unwrap();
    static ref COMPARISON_RE: Regex = Regex::new(r"\b(?:compare|vs|versus)\b").unwrap();
    static ref UPPER_BOUND_RE: Regex = Regex::new(r"\b(?:less|below|under)\b").unwrap();
    static ref LOWER_BOUND_RE: Regex = Regex::new(r"\b(?:more|greater|above)\b").unwrap();
    static ref NUMBER_RE: Regex = Regex::new(r"\d+(?:\.\d+)?").unwrap();
}

pub struct Planner {
    known_companies: BTreeSet<String>,
    llm: Option<AgentLlm>,
}

impl Planner {
    pub fn new<I, S>(known_companies: I, llm: Option<AgentLlm>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let known_companies = known_companies
            .into_iter()
            .map(|c| c.as_ref().trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        Self {
            known_companies,
            llm,
        }
    }

    pub fn known_companies(&self) -> &BTreeSet<String> {
        &self.known_companies
    }

    pub async fn analyze(&self, query: &str) -> QueryPlan {
        let companies = self.extract_companies(query);
        debug!(?companies, "detected companies");

        let plan = match &self.llm {
            Some(llm) => match self.analyze_with_llm(llm, query, &companies).await {
                Some(plan) => plan,
                None => {
                    warn!("LLM planning failed, using rule-based plan");
                    fallback_plan(query, companies)
                }
            },
            None => fallback_plan(query, companies),
        };

        info!(
            intent = %plan.intent,
            tools = ?plan.tool_names(),
            reasoning = %plan.reasoning,
            "Planned query"
        );
        plan
    }

    /// Lowercase substring match against known companies, plus the alias table
    pub fn extract_companies(&self, query: &str) -> BTreeSet<String> {
        let lower = query.to_lowercase();
        let mut found: BTreeSet<String> = self
            .known_companies
            .iter()
            .filter(|c| lower.contains(c.as_str()))
            .cloned()
            .collect();

        for (alias, canonical) in COMPANY_ALIASES {
            if lower.contains(alias) && self.known_companies.contains(canonical) {
                found.insert(canonical.to_string());
            }
        }
        found
    }

    async fn analyze_with_llm(
        &self,
        llm: &AgentLlm,
        query: &str,
        detected: &BTreeSet<String>,
    ) -> Option<QueryPlan> {
        let prompt = build_planner_prompt(query, detected, &self.known_companies);
        let response = llm.generate_json(SYSTEM_PROMPT, &prompt).await?;
        let plan = plan_from_llm(query, detected, &response)?;

        if is_aggregation_query(&query.to_lowercase()) && plan.intent != Intent::Aggregation {
            debug!(llm_intent = %plan.intent, "aggregation keywords override LLM intent");
            return Some(fallback_plan(query, detected.clone()));
        }
        Some(plan)
    }
}

fn build_planner_prompt(
    query: &str,
    detected: &BTreeSet<String>,
    known: &BTreeSet<String>,
) -> String {
    let detected: Vec<&String> = detected.iter().collect();
    let known: Vec<&String> = known.iter().take(PROMPT_COMPANY_LIMIT).collect();
    format!(
        r#"Analyze this placement query and create an execution plan.

**Query:** "{}"
**Detected companies:** {:?}
**Known companies:** {:?}

Return JSON:
```json
{{
    "intent": "aggregation|comparison|company_detail|general",
    "reasoning": "brief explanation",
    "companies": ["company1"],
    "attributes": ["stipend", "selection", "skills", "eligibility", "location"],
    "is_aggregation": true/false,
    "is_comparison": true/false,
    "tool": {{
        "name": "facts_lookup|semantic_search|compare_companies|hybrid_search",
        "action": "filter_by_location|get_company_details|etc (for facts_lookup)",
        "params": {{"location": "Bangalore", "company": "dell", "min_value": 40000}}
    }}
}}
```

RULES:
- For "how many/list/which companies" -> facts_lookup with appropriate filter action
- For "company X details/selection/skills" -> hybrid_search (needs both facts + semantic)
- For "compare X and Y" -> compare_companies
- For aggregation (count, filter), set is_aggregation=true

Return only valid JSON:"#,
        query, detected, known
    )
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Numbers sometimes arrive as "40,000" or "40000 INR"
fn normalize_number(params: &mut Map<String, Value>, key: &str) {
    let Some(value) = params.get(key) else {
        return;
    };
    let normalized = match value {
        Value::Number(_) => return,
        Value::String(s) => parse_number(s).and_then(serde_json::Number::from_f64),
        _ => None,
    };
    match normalized {
        Some(n) => {
            params.insert(key.to_string(), Value::Number(n));
        }
        None => {
            params.remove(key);
        }
    }
}

/// Result depth; values above [`MAX_TOP_K`] are capped
fn normalize_count(params: &mut Map<String, Value>, key: &str) {
    let count = match params.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_number(s),
        _ => return,
    };
    match count.filter(|n| *n >= 1.0) {
        Some(n) => {
            let capped = n.min(MAX_TOP_K as f64) as u64;
            params.insert(key.to_string(), Value::from(capped));
        }
        None => {
            params.remove(key);
        }
    }
}

fn fill_string(params: &mut Map<String, Value>, key: &str, default: &str) {
    let present = params
        .get(key)
        .and_then(Value::as_str)
        .map_or(false, |s| !s.trim().is_empty());
    if !present {
        params.insert(key.to_string(), Value::String(default.to_string()));
    }
}

fn fill_companies(params: &mut Map<String, Value>, companies: &BTreeSet<String>) {
    let listed = !string_list(params.get("companies")).is_empty();
    if !listed {
        params.insert(
            "companies".to_string(),
            Value::from(companies.iter().cloned().collect::<Vec<_>>()),
        );
    } else if let Some(Value::String(single)) = params.get("companies").cloned() {
        params.insert("companies".to_string(), Value::from(vec![single]));
    }
}

/// Turn the LLM's tool selection into a typed call
///
/// Returns `None` when a known tool is missing required parameters. An
/// unknown tool name is kept as [`ToolCall::Unrecognized`].
pub fn tool_call_from_llm(
    tool: &Map<String, Value>,
    query: &str,
    companies: &BTreeSet<String>,
) -> Option<ToolCall> {
    let name = tool
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("hybrid_search")
        .trim();
    let Ok(tool_id) = name.parse::<ToolId>() else {
        return Some(ToolCall::Unrecognized {
            name: name.to_string(),
        });
    };

    let mut params = match tool.get("params") {
        Some(Value::Object(p)) => p.clone(),
        _ => Map::new(),
    };
    params.retain(|_, v| !v.is_null());

    let call = match tool_id {
        ToolId::FactsLookup => {
            let action = tool
                .get("action")
                .and_then(Value::as_str)
                .or_else(|| params.get("action").and_then(Value::as_str))
                .map(|a| a.trim().to_string())?;
            params.insert("action".to_string(), Value::String(action));
            normalize_number(&mut params, "min_value");
            normalize_number(&mut params, "max_value");
            ToolCall::FactsLookup(serde_json::from_value(Value::Object(params)).ok()?)
        }
        ToolId::SemanticSearch => {
            fill_string(&mut params, "query", query);
            let search_type = params
                .get("search_type")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<ChunkType>().ok());
            match search_type {
                Some(t) => params.insert("search_type".to_string(), Value::from(t.as_str())),
                None => params.remove("search_type"),
            };
            normalize_count(&mut params, "top_k");
            ToolCall::SemanticSearch(serde_json::from_value(Value::Object(params)).ok()?)
        }
        ToolId::CompareCompanies => {
            fill_companies(&mut params, companies);
            if let Some(Value::String(attr)) = params.get("attributes").cloned() {
                params.insert("attributes".to_string(), Value::from(vec![attr]));
            }
            ToolCall::CompareCompanies(serde_json::from_value(Value::Object(params)).ok()?)
        }
        ToolId::HybridSearch => {
            fill_string(&mut params, "query", query);
            fill_companies(&mut params, companies);
            normalize_count(&mut params, "top_k");
            ToolCall::HybridSearch(serde_json::from_value(Value::Object(params)).ok()?)
        }
    };
    Some(call)
}

/// Build a plan from the planner LLM's JSON answer
pub fn plan_from_llm(
    query: &str,
    detected: &BTreeSet<String>,
    response: &Map<String, Value>,
) -> Option<QueryPlan> {
    let mut companies = detected.clone();
    companies.extend(
        string_list(response.get("companies"))
            .into_iter()
            .map(|c| c.to_lowercase()),
    );

    let tool = match response.get("tool") {
        Some(Value::Object(tool)) => tool.clone(),
        Some(_) => return None,
        None => Map::new(),
    };
    let call = tool_call_from_llm(&tool, query, &companies)?;

    let is_aggregation = response
        .get("is_aggregation")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let intent = if is_aggregation {
        Intent::Aggregation
    } else {
        response
            .get("intent")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(Intent::General)
    };

    Some(QueryPlan {
        original_query: query.to_string(),
        intent,
        tools_to_use: vec![call],
        companies_mentioned: companies,
        attributes_requested: string_list(response.get("attributes")),
        needs_enrichment: intent != Intent::Aggregation,
        fallback_to_hybrid: false,
        reasoning: response
            .get("reasoning")
            .and_then(Value::as_str)
            .filter(|r| !r.trim().is_empty())
            .unwrap_or("LLM analysis")
            .to_string(),
    })
}

/// Counting, listing and filtering phrasing
pub fn is_aggregation_query(query_lower: &str) -> bool {
    AGGREGATION_PHRASES.iter().any(|p| query_lower.contains(p))
        || COUNT_RE.is_match(query_lower)
        || STIPEND_COMPARATIVE_RE.is_match(query_lower)
        || CGPA_COMPARATIVE_RE.is_match(query_lower)
}

/// First number after `keyword`, else the first number anywhere
fn number_near(query_lower: &str, keyword: &str) -> Option<f64> {
    let cleaned = query_lower.replace(',', "");
    let after = cleaned
        .find(keyword)
        .map(|idx| &cleaned[idx + keyword.len()..])
        .and_then(|tail| NUMBER_RE.find(tail));
    after
        .or_else(|| NUMBER_RE.find(&cleaned))
        .and_then(|m| m.as_str().parse().ok())
}

fn aggregation_action(query_lower: &str) -> FactsAction {
    let mut action = FactsAction::GetAllCompanies;

    if let Some((_, city)) = CITIES.iter().find(|(key, _)| query_lower.contains(key)) {
        action = FactsAction::FilterByLocation {
            location: city.to_string(),
        };
    }

    if query_lower.contains("stipend") {
        if let Some(amount) = number_near(query_lower, "stipend") {
            if LOWER_BOUND_RE.is_match(query_lower) {
                action = FactsAction::FilterByStipend {
                    min_value: Some(amount),
                    max_value: None,
                };
            } else if UPPER_BOUND_RE.is_match(query_lower) {
                action = FactsAction::FilterByStipend {
                    min_value: None,
                    max_value: Some(amount),
                };
            }
        }
    }

    if query_lower.contains("cgpa") && UPPER_BOUND_RE.is_match(query_lower) {
        if let Some(cgpa) = number_near(query_lower, "cgpa") {
            action = FactsAction::FilterByCgpa { max_value: cgpa };
        }
    }

    action
}

/// Deterministic plan used without an LLM or when LLM planning fails
pub fn fallback_plan(query: &str, companies: BTreeSet<String>) -> QueryPlan {
    let lower = query.to_lowercase();

    let (intent, call, reasoning) = if is_aggregation_query(&lower) {
        (
            Intent::Aggregation,
            ToolCall::FactsLookup(aggregation_action(&lower)),
            "Aggregation query",
        )
    } else if companies.len() >= 2 || COMPARISON_RE.is_match(&lower) {
        (
            Intent::Comparison,
            ToolCall::CompareCompanies(CompareParams {
                companies: companies.iter().cloned().collect(),
                attributes: None,
                comparison_type: CompareType::Detailed,
                rank_by: None,
            }),
            "Comparison query",
        )
    } else {
        let reasoning = if companies.is_empty() {
            "General query, searching all companies"
        } else {
            "Hybrid query for comprehensive results"
        };
        (
            Intent::Hybrid,
            ToolCall::HybridSearch(HybridParams {
                query: query.to_string(),
                companies: companies.iter().cloned().collect(),
                top_k: None,
            }),
            reasoning,
        )
    };

    QueryPlan {
        original_query: query.to_string(),
        intent,
        tools_to_use: vec![call],
        companies_mentioned: companies,
        attributes_requested: Vec::new(),
        needs_enrichment: intent != Intent::Aggregation,
        fallback_to_hybrid: false,
        reasoning: reasoning.to_string(),
    }
}
