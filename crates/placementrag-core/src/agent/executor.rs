//! Runs a plan's tool calls and enriches the companies they surface

use super::plan::{Intent, QueryPlan};
use crate::store::{ChunkType, RoleRecord};
use crate::text::title_case;
use crate::tools::{
    FactsAction, SemanticParams, ToolCall, ToolData, ToolId, ToolResult, Toolbox,
    CONTEXT_SEPARATOR,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Chunks fetched per enrichment category
const ENRICHMENT_TOP_K: usize = 3;

/// Category-specific query templates; `{}` is the lowercase company
const ENRICHMENT_QUERIES: [(ChunkType, &str); 4] = [
    (ChunkType::SkillsRequired, "{} skills programming technical"),
    (ChunkType::InterviewProcess, "{} interview selection rounds test"),
    (ChunkType::RolesResponsibilities, "{} job responsibilities duties"),
    (ChunkType::AboutCompany, "{} company culture"),
];

/// Facts and merged semantic text gathered for one company
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCompany {
    pub facts: Vec<RoleRecord>,
    pub semantic: BTreeMap<ChunkType, String>,
}

impl EnrichedCompany {
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.semantic.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// At least one tool call succeeded
    pub success: bool,
    pub tool_results: Vec<ToolResult>,
    /// Keyed by title-cased company name
    pub enriched_results: Option<BTreeMap<String, EnrichedCompany>>,
    pub errors: Vec<String>,
}

impl ExecutionResult {
    pub fn has_enrichment(&self) -> bool {
        self.enriched_results
            .as_ref()
            .map_or(false, |e| !e.is_empty())
    }

    pub fn enriched(&self) -> impl Iterator<Item = (&String, &EnrichedCompany)> {
        self.enriched_results.iter().flatten()
    }

    /// Successful payloads in execution order
    pub fn data(&self) -> impl Iterator<Item = &ToolData> {
        self.tool_results.iter().filter_map(ToolResult::data)
    }
}

pub struct Executor {
    toolbox: Arc<Toolbox>,
}

impl Executor {
    pub fn new(toolbox: Arc<Toolbox>) -> Self {
        Self { toolbox }
    }

    pub async fn execute(&self, plan: &QueryPlan) -> ExecutionResult {
        let mut tool_results = Vec::new();
        let mut errors = Vec::new();

        for call in &plan.tools_to_use {
            debug!(%call, "executing tool");

            if let ToolCall::Unrecognized { name } = call {
                warn!("Skipping unknown tool: {}", name);
                errors.push(format!("Unknown tool: {}", name));
                continue;
            }

            if let Some(result) = self.multi_company_details(call, plan) {
                tool_results.push(result);
                continue;
            }

            match self.toolbox.invoke(call).await {
                Ok(result) => {
                    debug!(tool = %result.tool, success = result.success, message = %result.message);
                    tool_results.push(result);
                }
                Err(e) => {
                    warn!("Tool {} failed: {}", call.name(), e);
                    errors.push(format!("{}: {}", call.name(), e));
                }
            }
        }

        let enriched_results = if plan.needs_enrichment && plan.intent != Intent::Aggregation {
            Some(self.enrich(&tool_results, plan).await)
        } else {
            None
        };

        let success = tool_results.iter().any(|r| r.success);
        info!(
            success,
            tools = tool_results.len(),
            errors = errors.len(),
            enriched = enriched_results.as_ref().map_or(0, BTreeMap::len),
            "Executed plan"
        );

        ExecutionResult {
            success,
            tool_results,
            enriched_results,
            errors,
        }
    }

    /// `get_company_details` fans out over every planned company
    fn multi_company_details(&self, call: &ToolCall, plan: &QueryPlan) -> Option<ToolResult> {
        if !matches!(call, ToolCall::FactsLookup(FactsAction::GetCompanyDetails { .. }))
            || plan.companies_mentioned.is_empty()
        {
            return None;
        }

        let roles: Vec<RoleRecord> = plan
            .companies_mentioned
            .iter()
            .filter_map(|company| {
                match self.toolbox.facts.run(&FactsAction::GetCompanyDetails {
                    company: Some(company.clone()),
                }) {
                    ToolResult {
                        data: Some(ToolData::Roles { roles, .. }),
                        success: true,
                        ..
                    } => Some(roles),
                    _ => None,
                }
            })
            .flatten()
            .collect();

        if roles.is_empty() {
            return None;
        }

        let companies = plan.companies();
        let message = format!(
            "Found {} roles across {} companies",
            roles.len(),
            companies.len()
        );
        Some(ToolResult::success(
            ToolId::FactsLookup,
            format!("get_company_details:{}", companies.join(",")),
            ToolData::Roles {
                company: companies.join(", "),
                roles,
            },
            message,
        ))
    }

    async fn enrich(
        &self,
        tool_results: &[ToolResult],
        plan: &QueryPlan,
    ) -> BTreeMap<String, EnrichedCompany> {
        let mut companies: BTreeSet<String> = plan.companies_mentioned.clone();
        for data in tool_results.iter().filter_map(ToolResult::data) {
            companies.extend(data.surfaced_companies());
        }

        let mut enriched = BTreeMap::new();
        for company in companies.iter().filter(|c| !c.is_empty()) {
            let entry = self.enrich_company(company).await;
            if entry.is_empty() {
                debug!(company, "no data to enrich with");
                continue;
            }
            enriched.insert(title_case(company), entry);
        }
        enriched
    }

    async fn enrich_company(&self, company: &str) -> EnrichedCompany {
        let facts = match self.toolbox.facts.run(&FactsAction::GetCompanyDetails {
            company: Some(company.to_string()),
        }) {
            ToolResult {
                data: Some(ToolData::Roles { roles, .. }),
                success: true,
                ..
            } => roles,
            _ => Vec::new(),
        };

        let mut semantic = BTreeMap::new();
        for (chunk_type, template) in ENRICHMENT_QUERIES {
            let params = SemanticParams {
                query: template.replace("{}", company),
                search_type: Some(chunk_type),
                company: Some(company.to_string()),
                top_k: ENRICHMENT_TOP_K,
            };
            match self.toolbox.semantic.run(&params).await {
                Ok(ToolResult {
                    data: Some(ToolData::Semantic { results, .. }),
                    success: true,
                    ..
                }) if !results.is_empty() => {
                    let merged = results
                        .iter()
                        .take(ENRICHMENT_TOP_K)
                        .map(|h| h.text.as_str())
                        .collect::<Vec<_>>()
                        .join(CONTEXT_SEPARATOR);
                    semantic.insert(chunk_type, merged);
                }
                Ok(_) => {}
                Err(e) => warn!("Enrichment search for {} ({}) failed: {}", company, chunk_type, e),
            }
        }

        EnrichedCompany { facts, semantic }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::planner::fallback_plan;
    use crate::testing;
    use crate::tools::HybridParams;

    fn executor() -> Executor {
        Executor::new(Arc::new(Toolbox::new(
            testing::facts(),
            testing::semantic(),
            0.2,
        )))
    }

    fn companies(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_aggregation_is_not_enriched() {
        let plan = fallback_plan("List all companies", BTreeSet::new());
        let result = executor().execute(&plan).await;
        assert!(result.success);
        assert!(result.enriched_results.is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_recorded() {
        let mut plan = fallback_plan("Tell me about dell", companies(&["dell"]));
        plan.tools_to_use.insert(
            0,
            ToolCall::Unrecognized {
                name: "web_search".into(),
            },
        );
        let result = executor().execute(&plan).await;
        assert_eq!(result.errors, vec!["Unknown tool: web_search".to_string()]);
        assert_eq!(result.tool_results.len(), 1);
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_multi_company_details() {
        let mut plan = fallback_plan("dell and intel roles", companies(&["dell", "intel"]));
        plan.tools_to_use = vec![ToolCall::FactsLookup(FactsAction::GetCompanyDetails {
            company: None,
        })];
        let result = executor().execute(&plan).await;
        assert_eq!(result.tool_results[0].message, "Found 2 roles across 2 companies");
    }

    #[tokio::test]
    async fn test_enrichment_round_trip() {
        let plan = fallback_plan("Tell me about dell", companies(&["dell"]));
        let result = executor().execute(&plan).await;

        assert!(result.has_enrichment());
        let enriched = result.enriched_results.as_ref().expect("enrichment ran");
        let dell = &enriched["Dell"];
        assert_eq!(dell.facts.len(), 1);
        assert!(dell.semantic.contains_key(&ChunkType::InterviewProcess));
        assert!(dell.semantic.contains_key(&ChunkType::SkillsRequired));
    }

    #[tokio::test]
    async fn test_company_without_data_is_omitted() {
        let mut plan = fallback_plan("nokia", companies(&["nokia"]));
        plan.tools_to_use = vec![ToolCall::HybridSearch(HybridParams {
            query: "zzz".into(),
            companies: vec!["nokia".into()],
            top_k: None,
        })];
        let result = executor().execute(&plan).await;
        assert!(!result.has_enrichment());
        assert!(result.success);
    }
}
