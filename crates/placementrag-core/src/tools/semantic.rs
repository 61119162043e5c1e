//! Semantic search over categorized chunks

use super::{SemanticParams, ToolData, ToolId, ToolResult};
use crate::error::Result;
use crate::store::{SemanticHit, SemanticQuery, SemanticStore};
use std::sync::Arc;
use tracing::debug;

pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

pub struct SemanticSearchTool {
    store: Arc<dyn SemanticStore>,
    threshold: f32,
}

/// Hits rendered as `[Company - Role] (type)` blocks for prompting
pub fn build_context(hits: &[SemanticHit]) -> String {
    hits.iter()
        .map(|h| format!("[{} - {}] ({})\n{}", h.company, h.role, h.chunk_type, h.text))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

impl SemanticSearchTool {
    pub fn new(store: Arc<dyn SemanticStore>, threshold: f32) -> Self {
        Self { store, threshold }
    }

    pub async fn run(&self, params: &SemanticParams) -> Result<ToolResult> {
        let tool = ToolId::SemanticSearch;
        let query = params.query.trim();
        if query.is_empty() {
            return Ok(ToolResult::failure(tool, "", "Query is required"));
        }

        let request = SemanticQuery::new(query, params.top_k)
            .company(
                params
                    .company
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            )
            .chunk_type(params.search_type)
            .threshold(self.threshold);
        let results = self.store.search(&request).await?;
        debug!(query, hits = results.len(), "semantic search");

        let message = if results.is_empty() {
            format!("No relevant results found for: {}", query)
        } else {
            format!("Found {} relevant results", results.len())
        };
        let context = build_context(&results);
        Ok(ToolResult::success(
            tool,
            query,
            ToolData::Semantic { results, context },
            message,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ChunkType;
    use crate::testing;

    fn params(query: &str) -> SemanticParams {
        SemanticParams {
            query: query.to_string(),
            search_type: None,
            company: None,
            top_k: 5,
        }
    }

    #[tokio::test]
    async fn test_empty_query_fails() {
        let tool = SemanticSearchTool::new(testing::semantic(), 0.2);
        let result = tool.run(&params("   ")).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "Query is required");
    }

    #[tokio::test]
    async fn test_filtered_search_builds_context() {
        let tool = SemanticSearchTool::new(testing::semantic(), 0.2);
        let mut p = params("skills programming");
        p.search_type = Some(ChunkType::SkillsRequired);
        p.company = Some("dell".into());

        let result = tool.run(&p).await.unwrap();
        let Some(ToolData::Semantic { results, context }) = result.data() else {
            panic!("expected semantic data");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].company, "Dell");
        assert!(context.starts_with("[Dell - Software Intern] (skills_required)"));
    }

    #[tokio::test]
    async fn test_no_hits_still_succeeds() {
        let tool = SemanticSearchTool::new(testing::semantic(), 0.9);
        let result = tool.run(&params("quantum gardening")).await.unwrap();
        assert!(result.success);
        assert!(result.message.starts_with("No relevant results found"));
    }
}
