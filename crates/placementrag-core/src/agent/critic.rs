//! Result critic: confidence scoring and retry directives

use super::executor::ExecutionResult;
use super::plan::{retry_call, QueryPlan};
use crate::llm::AgentLlm;
use crate::store::parse_number;
use crate::tools::{ToolCall, ToolId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

pub const SYSTEM_PROMPT: &str = "You are a quality evaluator for a placement information system.
Evaluate whether the retrieved data adequately answers the user's question.
Be strict but fair - if the data contains the answer, it's complete.";

/// Confidence assumed when the LLM omits one
const DEFAULT_CONFIDENCE: f64 = 0.5;

const RULE_CONFIDENCE_WITH_DATA: f64 = 0.8;
const RULE_CONFIDENCE_WITHOUT_DATA: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticFeedback {
    pub is_complete: bool,
    pub is_relevant: bool,
    /// In [0, 1]
    pub confidence_score: f64,
    pub needs_retry: bool,
    pub retry_suggestions: Vec<ToolCall>,
    pub missing_info: Vec<String>,
    pub reasoning: String,
}

pub struct Critic {
    llm: Option<AgentLlm>,
    retry_threshold: f64,
    retry_top_k: usize,
}

impl Critic {
    pub fn new(llm: Option<AgentLlm>, retry_threshold: f64, retry_top_k: usize) -> Self {
        Self {
            llm,
            retry_threshold,
            retry_top_k,
        }
    }

    pub async fn evaluate(&self, plan: &QueryPlan, result: &ExecutionResult) -> CriticFeedback {
        let feedback = match &self.llm {
            Some(llm) => {
                let prompt = build_critic_prompt(plan, result);
                match llm.generate_json(SYSTEM_PROMPT, &prompt).await {
                    Some(response) => {
                        feedback_from_llm(&response, plan, self.retry_threshold, self.retry_top_k)
                    }
                    None => {
                        warn!("LLM critique failed, using rule-based evaluation");
                        self.fallback(plan, result)
                    }
                }
            }
            None => self.fallback(plan, result),
        };

        info!(
            confidence = feedback.confidence_score,
            complete = feedback.is_complete,
            needs_retry = feedback.needs_retry,
            "Critiqued results"
        );
        feedback
    }

    fn fallback(&self, plan: &QueryPlan, result: &ExecutionResult) -> CriticFeedback {
        fallback_feedback(plan, result, self.retry_threshold, self.retry_top_k)
    }
}

/// Compact description of what was retrieved, for the critic prompt
pub fn summarize_results(result: &ExecutionResult) -> String {
    let mut parts = Vec::new();

    for tool_result in &result.tool_results {
        match tool_result.data() {
            Some(data) => {
                parts.push(format!("[{}] SUCCESS:", tool_result.tool));
                parts.extend(data.summary().into_iter().map(|line| format!("  - {}", line)));
            }
            None => parts.push(format!("[{}] FAILED", tool_result.tool)),
        }
    }

    if result.has_enrichment() {
        let names: Vec<&String> = result.enriched().map(|(name, _)| name).collect();
        parts.push(format!("[Enriched] Companies: {:?}", names));
        for (company, entry) in result.enriched() {
            let categories: Vec<&str> = entry.semantic.keys().map(|k| k.as_str()).collect();
            parts.push(format!(
                "  - {}: {} roles, semantic: {:?}",
                company,
                entry.facts.len(),
                categories
            ));
        }
    }

    if parts.is_empty() {
        "No data retrieved".to_string()
    } else {
        parts.join("\n")
    }
}

fn build_critic_prompt(plan: &QueryPlan, result: &ExecutionResult) -> String {
    format!(
        r#"Evaluate if the retrieved data answers the user's question.

**User Question:** "{}"
**Intent:** {}
**Companies Asked:** {:?}
**Attributes Requested:** {:?}

**Retrieved Data Summary:**
{}

Return JSON:
```json
{{
    "is_complete": true/false,
    "is_relevant": true/false,
    "confidence": 0.0-1.0,
    "missing_info": ["list of missing information"],
    "needs_retry": true/false,
    "retry_tool": "hybrid_search|semantic_search|facts_lookup|compare_companies",
    "reasoning": "brief explanation"
}}
```

RULES:
- is_complete=true if the data contains info to answer the question
- is_relevant=true if the data is about what was asked
- confidence: 0.9+ if complete, 0.6-0.9 if partial, <0.6 if poor
- needs_retry=true only if confidence < 0.4

Return only JSON:"#,
        plan.original_query,
        plan.intent,
        plan.companies(),
        plan.attributes_requested,
        summarize_results(result)
    )
}

fn confidence_of(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_number(s),
        _ => None,
    };
    match raw {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

/// Interpret the critic LLM's JSON. Retry is decided by the threshold alone.
pub fn feedback_from_llm(
    response: &Map<String, Value>,
    plan: &QueryPlan,
    retry_threshold: f64,
    retry_top_k: usize,
) -> CriticFeedback {
    let flag = |key: &str| response.get(key).and_then(Value::as_bool).unwrap_or(false);
    let confidence_score = confidence_of(response.get("confidence"));
    let needs_retry = confidence_score < retry_threshold;

    let retry_suggestions = if needs_retry {
        vec![retry_call(plan, retry_top_k)]
    } else {
        Vec::new()
    };

    // A suggested tool is kept as a hint only; retries are always hybrid
    let mut reasoning = response
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if needs_retry {
        if let Some(tool) = response
            .get("retry_tool")
            .and_then(Value::as_str)
            .and_then(|t| t.parse::<ToolId>().ok())
            .filter(|t| *t != ToolId::HybridSearch)
        {
            if !reasoning.is_empty() {
                reasoning.push(' ');
            }
            reasoning.push_str(&format!("(suggested {})", tool));
        }
    }

    let missing_info = match response.get("missing_info") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    };

    CriticFeedback {
        is_complete: flag("is_complete"),
        is_relevant: flag("is_relevant"),
        confidence_score,
        needs_retry,
        retry_suggestions,
        missing_info,
        reasoning,
    }
}

/// Data-presence scoring used without an LLM or when the LLM call fails
pub fn fallback_feedback(
    plan: &QueryPlan,
    result: &ExecutionResult,
    retry_threshold: f64,
    retry_top_k: usize,
) -> CriticFeedback {
    let has_data = result.data().next().is_some() || result.has_enrichment();
    let confidence_score = if has_data {
        RULE_CONFIDENCE_WITH_DATA
    } else {
        RULE_CONFIDENCE_WITHOUT_DATA
    };
    let needs_retry = confidence_score < retry_threshold;

    CriticFeedback {
        is_complete: has_data,
        is_relevant: has_data,
        confidence_score,
        needs_retry,
        retry_suggestions: if needs_retry {
            vec![retry_call(plan, retry_top_k)]
        } else {
            Vec::new()
        },
        missing_info: Vec::new(),
        reasoning: "Rule-based evaluation".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::planner::fallback_plan;
    use crate::tools::{HybridParams, ToolData, ToolResult};
    use serde_json::json;

    fn plan() -> QueryPlan {
        fallback_plan("Tell me about dell", ["dell".to_string()].into_iter().collect())
    }

    fn empty_result() -> ExecutionResult {
        ExecutionResult {
            success: false,
            tool_results: vec![ToolResult::failure(ToolId::HybridSearch, "q", "boom")],
            enriched_results: None,
            errors: vec![],
        }
    }

    #[test]
    fn test_threshold_decides_retry() {
        let low = json!({"confidence": 0.35, "needs_retry": false});
        let feedback = feedback_from_llm(low.as_object().unwrap(), &plan(), 0.4, 10);
        assert!(feedback.needs_retry);
        assert_eq!(feedback.retry_suggestions.len(), 1);

        let ok = json!({"confidence": 0.45, "needs_retry": true});
        let feedback = feedback_from_llm(ok.as_object().unwrap(), &plan(), 0.4, 10);
        assert!(!feedback.needs_retry);
        assert!(feedback.retry_suggestions.is_empty());
    }

    #[test]
    fn test_confidence_clamped_and_defaulted() {
        let high = json!({"confidence": 7});
        assert_eq!(
            feedback_from_llm(high.as_object().unwrap(), &plan(), 0.4, 10).confidence_score,
            1.0
        );
        let missing = json!({"is_complete": true});
        let feedback = feedback_from_llm(missing.as_object().unwrap(), &plan(), 0.4, 10);
        assert_eq!(feedback.confidence_score, 0.5);
        assert!(feedback.is_complete);
        assert!(!feedback.is_relevant);
    }

    #[test]
    fn test_retry_tool_from_llm() {
        let hybrid = ToolCall::HybridSearch(HybridParams {
            query: "Tell me about dell".into(),
            companies: vec!["dell".into()],
            top_k: Some(10),
        });

        let response = json!({
            "confidence": 0.1,
            "retry_tool": "facts_lookup",
            "reasoning": "Only a company list"
        });
        let feedback = feedback_from_llm(response.as_object().unwrap(), &plan(), 0.4, 10);
        assert_eq!(feedback.retry_suggestions, vec![hybrid.clone()]);
        assert_eq!(feedback.reasoning, "Only a company list (suggested facts_lookup)");

        let response = json!({"confidence": 0.1, "retry_tool": "google"});
        let feedback = feedback_from_llm(response.as_object().unwrap(), &plan(), 0.4, 10);
        assert_eq!(feedback.retry_suggestions, vec![hybrid]);
        assert!(feedback.reasoning.is_empty());
    }

    #[test]
    fn test_rule_based_scores() {
        let feedback = fallback_feedback(&plan(), &empty_result(), 0.4, 10);
        assert_eq!(feedback.confidence_score, 0.2);
        assert!(feedback.needs_retry);
        assert_eq!(feedback.reasoning, "Rule-based evaluation");

        let mut with_data = empty_result();
        with_data.tool_results.push(ToolResult::success(
            ToolId::FactsLookup,
            "get_all_companies",
            ToolData::Companies {
                companies: vec!["Dell".into()],
            },
            "Found 1 companies",
        ));
        let feedback = fallback_feedback(&plan(), &with_data, 0.4, 10);
        assert_eq!(feedback.confidence_score, 0.8);
        assert!(!feedback.needs_retry);
    }

    #[test]
    fn test_summary_lines() {
        let mut result = empty_result();
        result.tool_results.push(ToolResult::success(
            ToolId::FactsLookup,
            "get_all_companies",
            ToolData::Companies {
                companies: vec!["Dell".into(), "Intel".into()],
            },
            "Found 2 companies",
        ));
        let summary = summarize_results(&result);
        assert!(summary.contains("[hybrid_search] FAILED"));
        assert!(summary.contains("[facts_lookup] SUCCESS:\n  - Found 2 companies"));

        let nothing = ExecutionResult {
            success: false,
            tool_results: vec![],
            enriched_results: Some(Default::default()),
            errors: vec![],
        };
        assert_eq!(summarize_results(&nothing), "No data retrieved");
    }
}
