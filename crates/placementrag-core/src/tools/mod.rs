//! Retrieval tools layered over the facts and semantic stores
//!
//! Tools form a closed set. A [`ToolCall`] carries the typed parameters for
//! exactly one tool and [`Toolbox::invoke`] dispatches on it.

mod compare;
mod facts;
mod hybrid;
mod semantic;

pub use compare::{
    BestFor, CompanyProfile, CompanyScore, CompareCompaniesTool, ComparisonRow, ComparisonTable,
    RankEntry, Ranking,
};
pub use facts::FactsLookupTool;
pub use hybrid::{HybridData, HybridSearchTool, DEFAULT_HYBRID_TOP_K};
pub use semantic::{build_context, SemanticSearchTool, CONTEXT_SEPARATOR};

use crate::error::Result;
use crate::store::{
    AttributeValue, ChunkType, FactsStore, RoleRecord, SemanticHit, SemanticStore, StipendEntry,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Tool discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    FactsLookup,
    SemanticSearch,
    CompareCompanies,
    HybridSearch,
}

impl ToolId {
    pub const ALL: [ToolId; 4] = [
        ToolId::FactsLookup,
        ToolId::SemanticSearch,
        ToolId::CompareCompanies,
        ToolId::HybridSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::FactsLookup => "facts_lookup",
            ToolId::SemanticSearch => "semantic_search",
            ToolId::CompareCompanies => "compare_companies",
            ToolId::HybridSearch => "hybrid_search",
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        ToolId::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown tool: {}", s))
    }
}

/// Structured lookup to run against the facts store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FactsAction {
    GetAllCompanies,
    GetCompanyDetails {
        #[serde(default)]
        company: Option<String>,
    },
    GetAllStipends,
    FilterByStipend {
        #[serde(default)]
        min_value: Option<f64>,
        #[serde(default)]
        max_value: Option<f64>,
    },
    FilterByCgpa {
        max_value: f64,
    },
    FilterByLocation {
        location: String,
    },
    FilterByBranch {
        branch: String,
    },
    GetAttribute {
        attribute: String,
        #[serde(default)]
        company: Option<String>,
    },
    GetEligibility {
        #[serde(default)]
        company: Option<String>,
    },
    GetSelectionProcess {
        #[serde(default)]
        company: Option<String>,
    },
}

impl FactsAction {
    pub fn name(&self) -> &'static str {
        match self {
            FactsAction::GetAllCompanies => "get_all_companies",
            FactsAction::GetCompanyDetails { .. } => "get_company_details",
            FactsAction::GetAllStipends => "get_all_stipends",
            FactsAction::FilterByStipend { .. } => "filter_by_stipend",
            FactsAction::FilterByCgpa { .. } => "filter_by_cgpa",
            FactsAction::FilterByLocation { .. } => "filter_by_location",
            FactsAction::FilterByBranch { .. } => "filter_by_branch",
            FactsAction::GetAttribute { .. } => "get_attribute",
            FactsAction::GetEligibility { .. } => "get_eligibility",
            FactsAction::GetSelectionProcess { .. } => "get_selection_process",
        }
    }
}

fn default_semantic_top_k() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticParams {
    pub query: String,
    /// `None` searches every category
    #[serde(default)]
    pub search_type: Option<ChunkType>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default = "default_semantic_top_k")]
    pub top_k: usize,
}

/// Shape of a comparison result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareType {
    Detailed,
    Ranking,
    BestFor,
    /// Also what unknown comparison types fall back to
    #[default]
    #[serde(other)]
    Table,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareParams {
    pub companies: Vec<String>,
    #[serde(default)]
    pub attributes: Option<Vec<String>>,
    #[serde(default)]
    pub comparison_type: CompareType,
    #[serde(default)]
    pub rank_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridParams {
    pub query: String,
    #[serde(default)]
    pub companies: Vec<String>,
    /// Semantic discovery depth; the executor default applies when unset
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// One planned tool invocation with its typed parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    FactsLookup(FactsAction),
    SemanticSearch(SemanticParams),
    CompareCompanies(CompareParams),
    HybridSearch(HybridParams),
    /// A tool name that is not part of the toolbox; skipped with an error at execution
    Unrecognized { name: String },
}

impl ToolCall {
    pub fn tool_id(&self) -> Option<ToolId> {
        match self {
            ToolCall::FactsLookup(_) => Some(ToolId::FactsLookup),
            ToolCall::SemanticSearch(_) => Some(ToolId::SemanticSearch),
            ToolCall::CompareCompanies(_) => Some(ToolId::CompareCompanies),
            ToolCall::HybridSearch(_) => Some(ToolId::HybridSearch),
            ToolCall::Unrecognized { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ToolCall::Unrecognized { name } => name,
            other => other.tool_id().map_or("unknown", |id| id.as_str()),
        }
    }

    /// Facts action name, for tracing
    pub fn action(&self) -> Option<&'static str> {
        match self {
            ToolCall::FactsLookup(action) => Some(action.name()),
            _ => None,
        }
    }
}

impl fmt::Display for ToolCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action() {
            Some(action) => write!(f, "{}:{}", self.name(), action),
            None => f.write_str(self.name()),
        }
    }
}

/// What a facts filter matched on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum MatchCriterion {
    Stipend {
        min: Option<f64>,
        max: Option<f64>,
    },
    Cgpa {
        max: f64,
    },
    Location {
        location: String,
    },
    Branch {
        branch: String,
    },
    Eligibility {
        company: Option<String>,
    },
    SelectionProcess {
        company: Option<String>,
    },
}

impl fmt::Display for MatchCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchCriterion::Stipend { min, max } => {
                let mut parts = Vec::new();
                if let Some(min) = min {
                    parts.push(format!(">= {}", min));
                }
                if let Some(max) = max {
                    parts.push(format!("<= {}", max));
                }
                if parts.is_empty() {
                    f.write_str("any stipend")
                } else {
                    write!(f, "stipend {}", parts.join(" and "))
                }
            }
            MatchCriterion::Cgpa { max } => write!(f, "CGPA requirement <= {}", max),
            MatchCriterion::Location { location } => f.write_str(location),
            MatchCriterion::Branch { branch } => write!(f, "{} students", branch),
            MatchCriterion::Eligibility { company } | MatchCriterion::SelectionProcess { company } => {
                f.write_str(company.as_deref().unwrap_or("specified criteria"))
            }
        }
    }
}

/// Typed payload of a successful tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolData {
    Companies {
        companies: Vec<String>,
    },
    Roles {
        company: String,
        roles: Vec<RoleRecord>,
    },
    Stipends {
        stipends: Vec<StipendEntry>,
    },
    Matches {
        criterion: MatchCriterion,
        results: Vec<RoleRecord>,
    },
    Attribute {
        attribute: String,
        values: Vec<AttributeValue>,
    },
    Semantic {
        results: Vec<SemanticHit>,
        context: String,
    },
    ComparisonTable(ComparisonTable),
    ComparisonDetail {
        profiles: Vec<CompanyProfile>,
    },
    Ranking(Ranking),
    BestFor(BestFor),
    Hybrid(HybridData),
}

impl ToolData {
    /// Count lines for the critic's summary ("Found 3 companies")
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self {
            ToolData::Companies { companies } => {
                lines.push(format!("Found {} companies", companies.len()));
            }
            ToolData::Roles { roles, .. } => lines.push(format!("Found {} roles", roles.len())),
            ToolData::Stipends { stipends } => {
                lines.push(format!("Found {} results", stipends.len()));
            }
            ToolData::Matches { results, .. } => {
                lines.push(format!("Found {} results", results.len()));
            }
            ToolData::Attribute { values, .. } => {
                lines.push(format!("Found {} results", values.len()));
            }
            ToolData::Semantic { results, .. } => {
                lines.push(format!("Found {} results", results.len()));
            }
            ToolData::ComparisonTable(table) => {
                lines.push(format!("Found {} companies", table.companies.len()));
            }
            ToolData::ComparisonDetail { profiles } => {
                lines.push(format!("Found {} companies", profiles.len()));
            }
            ToolData::Ranking(ranking) => {
                lines.push(format!("Found {} results", ranking.entries.len()));
            }
            ToolData::BestFor(best) => {
                lines.push(format!("Found {} companies", best.scores.len()));
            }
            ToolData::Hybrid(hybrid) => {
                lines.push(format!("Found {} companies", hybrid.companies.len()));
                lines.push(format!("Found {} results", hybrid.semantic.len()));
            }
        }
        lines
    }

    /// Lowercase company names this payload refers to
    pub fn surfaced_companies(&self) -> BTreeSet<String> {
        let names: Vec<&str> = match self {
            ToolData::Roles { roles, .. } => roles.iter().map(|r| r.company_name.as_str()).collect(),
            ToolData::Matches { results, .. } => {
                results.iter().map(|r| r.company_name.as_str()).collect()
            }
            ToolData::Attribute { values, .. } => values.iter().map(|v| v.company.as_str()).collect(),
            ToolData::Semantic { results, .. } => results.iter().map(|h| h.company.as_str()).collect(),
            ToolData::Hybrid(hybrid) => hybrid
                .semantic
                .iter()
                .map(|h| h.company.as_str())
                .chain(hybrid.facts.keys().map(String::as_str))
                .collect(),
            _ => Vec::new(),
        };
        names
            .into_iter()
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect()
    }
}

/// Outcome of one tool invocation; `data` is present exactly when `success` is true
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub data: Option<ToolData>,
    pub message: String,
    pub tool: ToolId,
    /// Invocation key, e.g. "filter_by_stipend:>=40000"
    pub query: String,
}

impl ToolResult {
    pub fn success(
        tool: ToolId,
        query: impl Into<String>,
        data: ToolData,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            tool,
            query: query.into(),
        }
    }

    pub fn failure(tool: ToolId, query: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
            tool,
            query: query.into(),
        }
    }

    /// Data of a successful call
    pub fn data(&self) -> Option<&ToolData> {
        if self.success {
            self.data.as_ref()
        } else {
            None
        }
    }
}

/// All tools behind one dispatch point
pub struct Toolbox {
    pub facts: FactsLookupTool,
    pub semantic: SemanticSearchTool,
    pub compare: CompareCompaniesTool,
    pub hybrid: HybridSearchTool,
}

impl Toolbox {
    pub fn new(
        facts_store: Arc<dyn FactsStore>,
        semantic_store: Arc<dyn SemanticStore>,
        semantic_threshold: f32,
    ) -> Self {
        Self {
            facts: FactsLookupTool::new(facts_store.clone()),
            semantic: SemanticSearchTool::new(semantic_store.clone(), semantic_threshold),
            compare: CompareCompaniesTool::new(facts_store.clone(), semantic_store.clone()),
            hybrid: HybridSearchTool::new(facts_store, semantic_store, semantic_threshold),
        }
    }

    /// Run a single call. `Unrecognized` calls are reported as failed results.
    pub async fn invoke(&self, call: &ToolCall) -> Result<ToolResult> {
        match call {
            ToolCall::FactsLookup(action) => Ok(self.facts.run(action)),
            ToolCall::SemanticSearch(params) => self.semantic.run(params).await,
            ToolCall::CompareCompanies(params) => Ok(self.compare.run(params)),
            ToolCall::HybridSearch(params) => self.hybrid.run(params).await,
            ToolCall::Unrecognized { name } => Err(crate::error::PlacementError::InvalidInput(
                format!("Unknown tool: {}", name),
            )),
        }
    }
}
