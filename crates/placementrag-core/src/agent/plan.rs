//! Typed execution plan produced by the planner

use crate::tools::{HybridParams, ToolCall};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Counting, listing or filtering across companies
    Aggregation,
    Comparison,
    CompanyDetail,
    Hybrid,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Aggregation => "aggregation",
            Intent::Comparison => "comparison",
            Intent::CompanyDetail => "company_detail",
            Intent::Hybrid => "hybrid",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aggregation" => Ok(Intent::Aggregation),
            "comparison" => Ok(Intent::Comparison),
            "company_detail" => Ok(Intent::CompanyDetail),
            "hybrid" => Ok(Intent::Hybrid),
            "general" => Ok(Intent::General),
            other => Err(format!("unknown intent: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub original_query: String,
    pub intent: Intent,
    /// Never empty once planned
    pub tools_to_use: Vec<ToolCall>,
    /// Lowercase company names
    pub companies_mentioned: BTreeSet<String>,
    pub attributes_requested: Vec<String>,
    pub needs_enrichment: bool,
    pub fallback_to_hybrid: bool,
    pub reasoning: String,
}

impl QueryPlan {
    pub fn companies(&self) -> Vec<String> {
        self.companies_mentioned.iter().cloned().collect()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools_to_use.iter().map(ToString::to_string).collect()
    }
}

/// Single replacement call used when the critic asks for another attempt.
/// Always a hybrid search over the original query, so a retry broadens the
/// search whatever tool the first attempt used.
pub fn retry_call(plan: &QueryPlan, top_k: usize) -> ToolCall {
    ToolCall::HybridSearch(HybridParams {
        query: plan.original_query.clone(),
        companies: plan.companies(),
        top_k: Some(top_k),
    })
}
