//! Plan, execute, critique, retry and synthesize

use super::critic::{Critic, CriticFeedback};
use super::executor::{ExecutionResult, Executor};
use super::plan::{retry_call, Intent, QueryPlan};
use super::planner::{fallback_plan, Planner};
use super::synthesizer::Synthesizer;
use crate::config::{AgentSettings, Config};
use crate::error::{PlacementError, Result};
use crate::llm::{AgentLlm, LLMClient};
use crate::store::{ClientEncoder, FactsIndex, FactsStore, SemanticIndex, SemanticStore};
use crate::tools::{ToolCall, Toolbox};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info};

/// Answer plus the full audit trail of how it was produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub answer: String,
    /// Plan used for the final execution
    pub plan: QueryPlan,
    pub execution: ExecutionResult,
    pub feedback: CriticFeedback,
    pub retries: u32,
    pub answered_at: DateTime<Utc>,
}

pub struct PlacementAgent {
    facts: Arc<dyn FactsStore>,
    planner: Planner,
    executor: Executor,
    critic: Critic,
    synthesizer: Synthesizer,
    settings: AgentSettings,
}

impl PlacementAgent {
    /// `llm` is handed to each component whose `use_llm_*` flag is set
    pub fn new(
        facts: Arc<dyn FactsStore>,
        semantic: Arc<dyn SemanticStore>,
        llm: Option<AgentLlm>,
        settings: AgentSettings,
    ) -> Self {
        let llm_for = |enabled: bool| llm.clone().filter(|_| enabled);

        let toolbox = Arc::new(Toolbox::new(
            facts.clone(),
            semantic,
            settings.semantic_threshold,
        ));

        Self {
            planner: Planner::new(facts.get_all_companies(), llm_for(settings.use_llm_planner)),
            executor: Executor::new(toolbox),
            critic: Critic::new(
                llm_for(settings.use_llm_critic),
                settings.retry_threshold,
                settings.retry_top_k,
            ),
            synthesizer: Synthesizer::new(
                llm_for(settings.use_llm_synthesizer),
                settings.min_answer_chars,
            ),
            facts,
            settings,
        }
    }

    /// Load both stores from the configured files
    ///
    /// `client` serves query embeddings for the semantic store and, when the
    /// agent settings ask for it, the planner/critic/synthesizer completions.
    pub fn from_config(config: &Config, client: Arc<dyn LLMClient>) -> Result<Self> {
        let facts = FactsIndex::load(&config.data.facts_file)?;
        let encoder = Arc::new(ClientEncoder::new(client.clone()));
        let semantic = SemanticIndex::load(&config.data.semantic_index_file, encoder)?;

        info!(
            roles = facts.len(),
            chunks = semantic.len(),
            "Loaded placement stores"
        );

        let llm = config
            .agent
            .uses_llm()
            .then(|| AgentLlm::new(client, config.agent.llm_timeout()));

        Ok(Self::new(
            Arc::new(facts),
            Arc::new(semantic),
            llm,
            config.agent.clone(),
        ))
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Company names known to the facts store, sorted
    pub fn get_companies(&self) -> Vec<String> {
        self.facts.get_all_companies()
    }

    /// Answer a question. Never fails: problems become a failed response.
    pub async fn query(&self, text: &str) -> AgentResponse {
        let text = text.trim();
        if text.is_empty() {
            return failed_response(
                text,
                PlacementError::InvalidInput("Query is empty".to_string()),
            );
        }

        match AssertUnwindSafe(self.run(text)).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("Query pipeline panicked: {}", reason);
                failed_response(text, PlacementError::Other(anyhow::anyhow!(reason)))
            }
        }
    }

    async fn run(&self, text: &str) -> AgentResponse {
        let mut plan = self.planner.analyze(text).await;
        let mut execution = self.executor.execute(&plan).await;
        let mut feedback = self.critic.evaluate(&plan, &execution).await;

        let mut retries = 0;
        while feedback.needs_retry && retries < self.settings.max_retries {
            retries += 1;
            info!(
                retry = retries,
                confidence = feedback.confidence_score,
                "Retrying with adjusted plan"
            );
            plan = self.adjust_plan(plan, &feedback);
            execution = self.executor.execute(&plan).await;
            feedback = self.critic.evaluate(&plan, &execution).await;
        }

        let answer = self.synthesizer.synthesize(&plan, &execution, &feedback).await;

        AgentResponse {
            answer,
            plan,
            execution,
            feedback,
            retries,
            answered_at: Utc::now(),
        }
    }

    /// Replace the plan's tools with the critic's first suggestion
    fn adjust_plan(&self, mut plan: QueryPlan, feedback: &CriticFeedback) -> QueryPlan {
        let call = match feedback.retry_suggestions.first() {
            Some(suggestion @ ToolCall::HybridSearch(_)) => suggestion.clone(),
            _ => retry_call(&plan, self.settings.retry_top_k),
        };

        plan.tools_to_use = vec![call];
        plan.fallback_to_hybrid = true;
        plan
    }
}

fn failed_response(query: &str, err: PlacementError) -> AgentResponse {
    let answer = match &err {
        PlacementError::InvalidInput(_) => {
            "Please ask a question about companies, stipends, eligibility or selection processes."
                .to_string()
        }
        other => format!("Sorry, something went wrong while answering: {}", other),
    };

    let mut plan = fallback_plan(query, BTreeSet::new());
    plan.intent = Intent::General;
    plan.reasoning = err.to_string();

    AgentResponse {
        answer,
        plan,
        execution: ExecutionResult {
            success: false,
            tool_results: Vec::new(),
            enriched_results: None,
            errors: vec![err.to_string()],
        },
        feedback: CriticFeedback {
            is_complete: false,
            is_relevant: false,
            confidence_score: 0.0,
            needs_retry: false,
            retry_suggestions: Vec::new(),
            missing_info: Vec::new(),
            reasoning: err.to_string(),
        },
        retries: 0,
        answered_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::tools::ToolCall;

    fn agent() -> PlacementAgent {
        PlacementAgent::new(
            testing::facts(),
            testing::semantic(),
            None,
            AgentSettings::rule_based(),
        )
    }

    #[tokio::test]
    async fn test_blank_query_fails_gracefully() {
        let response = agent().query("   ").await;
        assert_eq!(response.feedback.confidence_score, 0.0);
        assert!(!response.execution.success);
        assert!(response.answer.starts_with("Please ask a question"));
        assert!(!response.plan.tools_to_use.is_empty());
    }

    #[tokio::test]
    async fn test_companies_sorted() {
        assert_eq!(agent().get_companies(), vec!["Bosch", "Dell", "Intel"]);
    }

    #[tokio::test]
    async fn test_rule_based_detail_query() {
        let response = agent().query("What is the selection process at Dell?").await;
        assert_eq!(response.plan.intent, Intent::Hybrid);
        assert_eq!(response.retries, 0);
        assert!(response.answer.contains("## DELL"));
        assert!(response.answer.contains("Selection Process"));
    }

    #[tokio::test]
    async fn test_retry_coarsens_plan() {
        let settings = AgentSettings::rule_based();
        let agent = PlacementAgent::new(
            testing::facts(),
            testing::semantic(),
            None,
            settings.clone(),
        );
        let plan = fallback_plan("dell", ["dell".to_string()].into());
        let feedback = CriticFeedback {
            is_complete: false,
            is_relevant: false,
            confidence_score: 0.1,
            needs_retry: true,
            retry_suggestions: vec![],
            missing_info: vec![],
            reasoning: String::new(),
        };
        let adjusted = agent.adjust_plan(plan, &feedback);
        assert!(adjusted.fallback_to_hybrid);
        match &adjusted.tools_to_use[..] {
            [ToolCall::HybridSearch(p)] => assert_eq!(p.top_k, Some(settings.retry_top_k)),
            other => panic!("unexpected tools {:?}", other),
        }
    }
}
