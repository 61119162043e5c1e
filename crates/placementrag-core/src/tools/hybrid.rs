//! Composite search: semantic discovery followed by per-company facts

use super::semantic::build_context;
use super::{HybridParams, ToolData, ToolId, ToolResult};
use crate::error::Result;
use crate::store::{FactsStore, RoleRecord, SemanticHit, SemanticQuery, SemanticStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Semantic depth when the call does not set one
pub const DEFAULT_HYBRID_TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridData {
    /// Requested and discovered companies, lowercase
    pub companies: Vec<String>,
    pub semantic: Vec<SemanticHit>,
    pub context: String,
    /// Roles per lowercase company, only for companies with facts
    pub facts: BTreeMap<String, Vec<RoleRecord>>,
}

pub struct HybridSearchTool {
    facts: Arc<dyn FactsStore>,
    semantic: Arc<dyn SemanticStore>,
    threshold: f32,
}

impl HybridSearchTool {
    pub fn new(
        facts: Arc<dyn FactsStore>,
        semantic: Arc<dyn SemanticStore>,
        threshold: f32,
    ) -> Self {
        Self {
            facts,
            semantic,
            threshold,
        }
    }

    pub async fn run(&self, params: &HybridParams) -> Result<ToolResult> {
        let top_k = params.top_k.unwrap_or(DEFAULT_HYBRID_TOP_K);
        let request = SemanticQuery::new(params.query.trim(), top_k).threshold(self.threshold);

        let semantic = if request.query.is_empty() {
            Vec::new()
        } else {
            match self.semantic.search(&request).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!("Hybrid semantic search failed, continuing with facts only: {}", e);
                    Vec::new()
                }
            }
        };

        let companies: BTreeSet<String> = params
            .companies
            .iter()
            .chain(semantic.iter().map(|h| &h.company))
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();

        let facts: BTreeMap<String, Vec<RoleRecord>> = companies
            .iter()
            .filter_map(|company| {
                let roles = self.facts.get_by_company(company);
                (!roles.is_empty()).then(|| (company.clone(), roles))
            })
            .collect();

        debug!(
            top_k,
            hits = semantic.len(),
            companies = companies.len(),
            with_facts = facts.len(),
            "hybrid search"
        );

        let message = format!("Found {} companies", companies.len());
        let context = build_context(&semantic);
        Ok(ToolResult::success(
            ToolId::HybridSearch,
            params.query.trim(),
            ToolData::Hybrid(HybridData {
                companies: companies.into_iter().collect(),
                semantic,
                context,
                facts,
            }),
            message,
        ))
    }
}
