//! End-to-end pipeline tests over on-disk fixture stores

mod common;

use common::{llm_settings, Fixture, ScriptedLlm, Stage, LONG_ANSWER};
use placementrag_core::tools::{FactsAction, ToolCall};
use placementrag_core::{AgentSettings, ChunkType, Intent};
use serde_json::json;

fn critic_reply(confidence: f64) -> String {
    json!({
        "is_complete": confidence >= 0.6,
        "is_relevant": true,
        "confidence": confidence,
        "missing_info": [],
        "reasoning": "scripted"
    })
    .to_string()
}

fn hybrid_plan_reply(company: &str) -> String {
    json!({
        "intent": "company_detail",
        "reasoning": "needs facts and descriptions",
        "companies": [company],
        "is_aggregation": false,
        "tool": {"name": "hybrid_search", "params": {"companies": [company]}}
    })
    .to_string()
}

#[tokio::test]
async fn test_companies_listed_from_facts_file() {
    let fixture = Fixture::new(AgentSettings::rule_based());
    let agent = fixture.agent(ScriptedLlm::offline());
    assert_eq!(
        agent.get_companies(),
        vec!["Acme", "Birch", "Cedar", "Dell", "Intel"]
    );
}

#[tokio::test]
async fn test_stipend_filter_lists_exact_matches() {
    let fixture = Fixture::new(AgentSettings::rule_based());
    let agent = fixture.agent(ScriptedLlm::offline());

    let response = agent
        .query("Which companies offer stipend more than 40000?")
        .await;

    assert_eq!(response.plan.intent, Intent::Aggregation);
    assert!(matches!(
        response.plan.tools_to_use[..],
        [ToolCall::FactsLookup(FactsAction::FilterByStipend {
            min_value: Some(m),
            max_value: None
        })] if m == 40000.0
    ));
    assert!(response.execution.enriched_results.is_none());
    assert!(response
        .answer
        .contains("**2 companies matching stipend >= 40000:**"));
    assert!(response.answer.contains("Birch"));
    assert!(response.answer.contains("Cedar"));
    for absent in ["Acme", "Dell", "Intel"] {
        assert!(!response.answer.contains(absent), "{} listed", absent);
    }
}

#[tokio::test]
async fn test_location_count_without_llm() {
    let fixture = Fixture::new(AgentSettings::rule_based());
    let agent = fixture.agent(ScriptedLlm::offline());

    let response = agent.query("How many companies are in Bangalore?").await;
    assert_eq!(response.plan.intent, Intent::Aggregation);
    assert!(response.answer.contains("**3 companies matching Bangalore:**"));
    assert!(!response.answer.contains("Cedar"));
}

#[tokio::test]
async fn test_compare_two_companies() {
    let fixture = Fixture::new(AgentSettings::rule_based());
    let agent = fixture.agent(ScriptedLlm::offline());

    let response = agent.query("Compare Dell and Intel").await;

    assert_eq!(response.plan.intent, Intent::Comparison);
    assert!(matches!(
        response.plan.tools_to_use[..],
        [ToolCall::CompareCompanies(_)]
    ));
    assert!(response.execution.success);
    assert_eq!(response.retries, 0);

    let enriched = response.execution.enriched_results.as_ref().unwrap();
    assert!(enriched.contains_key("Dell"));
    assert!(enriched.contains_key("Intel"));
    assert!(response.answer.contains("## DELL"));
    assert!(response.answer.contains("## INTEL"));
}

#[tokio::test]
async fn test_enrichment_pulls_interview_chunks() {
    let fixture = Fixture::new(AgentSettings::rule_based());
    let agent = fixture.agent(ScriptedLlm::offline());

    let response = agent.query("What is the selection process at Dell?").await;

    assert_eq!(response.plan.intent, Intent::Hybrid);
    let enriched = response.execution.enriched_results.as_ref().unwrap();
    let dell = &enriched["Dell"];
    assert_eq!(dell.facts.len(), 1);
    assert_eq!(dell.facts[0].role(), "Software Engineer Intern");
    assert!(dell.semantic[&ChunkType::InterviewProcess].contains("Two technical interview rounds"));
    assert!(response.answer.contains("Selection Process"));
}

#[tokio::test]
async fn test_offline_llm_falls_back_everywhere() {
    let fixture = Fixture::new(llm_settings());
    let llm = ScriptedLlm::offline();
    let agent = fixture.agent(llm.clone());

    let response = agent.query("Tell me about Dell").await;

    assert_eq!(response.plan.reasoning, "Hybrid query for comprehensive results");
    assert_eq!(response.feedback.reasoning, "Rule-based evaluation");
    assert!(response.answer.contains("## DELL"));
    assert_eq!(llm.calls(Stage::Planner), 1);
    assert_eq!(llm.calls(Stage::Critic), 1);
    assert_eq!(llm.calls(Stage::Synthesizer), 1);
}

#[tokio::test]
async fn test_malformed_planner_output_uses_rules() {
    let fixture = Fixture::new(llm_settings());
    let llm = ScriptedLlm::new(|stage, _| {
        Ok(match stage {
            Stage::Planner => "I think you should search for Dell somewhere".to_string(),
            Stage::Critic => critic_reply(0.9),
            Stage::Synthesizer => LONG_ANSWER.to_string(),
        })
    });
    let agent = fixture.agent(llm.clone());

    let response = agent.query("What is the selection process at Dell?").await;

    assert_eq!(response.plan.intent, Intent::Hybrid);
    assert_eq!(response.plan.reasoning, "Hybrid query for comprehensive results");
    assert_eq!(response.answer, LONG_ANSWER);
    assert_eq!(llm.calls(Stage::Planner), 1);
}

#[tokio::test]
async fn test_llm_plan_with_string_amount() {
    let fixture = Fixture::new(llm_settings());
    let llm = ScriptedLlm::new(|stage, _| {
        Ok(match stage {
            Stage::Planner => json!({
                "intent": "aggregation",
                "is_aggregation": true,
                "reasoning": "filter on stipend",
                "tool": {
                    "name": "facts_lookup",
                    "action": "filter_by_stipend",
                    "params": {"min_value": "40,000"}
                }
            })
            .to_string(),
            Stage::Critic => critic_reply(0.95),
            Stage::Synthesizer => LONG_ANSWER.to_string(),
        })
    });
    let agent = fixture.agent(llm.clone());

    let response = agent
        .query("Which companies pay a stipend above 40000?")
        .await;

    assert_eq!(response.plan.reasoning, "filter on stipend");
    assert!(response.answer.contains("**2 companies matching stipend >= 40000:**"));
    assert_eq!(llm.calls(Stage::Synthesizer), 0);
}

#[tokio::test]
async fn test_aggregation_keywords_override_llm_intent() {
    let fixture = Fixture::new(llm_settings());
    let llm = ScriptedLlm::new(|stage, _| {
        Ok(match stage {
            Stage::Planner => json!({
                "intent": "general",
                "is_aggregation": false,
                "tool": {"name": "hybrid_search", "params": {}}
            })
            .to_string(),
            Stage::Critic => critic_reply(0.9),
            Stage::Synthesizer => LONG_ANSWER.to_string(),
        })
    });
    let agent = fixture.agent(llm.clone());

    let response = agent.query("How many companies are in Bangalore?").await;

    assert_eq!(response.plan.intent, Intent::Aggregation);
    assert_eq!(response.plan.reasoning, "Aggregation query");
    assert!(matches!(
        &response.plan.tools_to_use[..],
        [ToolCall::FactsLookup(FactsAction::FilterByLocation { location })] if location == "Bangalore"
    ));
    assert!(response.answer.contains("**3 companies matching Bangalore:**"));
    assert_eq!(llm.calls(Stage::Synthesizer), 0);
}

#[tokio::test]
async fn test_low_confidence_retries_until_limit() {
    let fixture = Fixture::new(llm_settings());
    let llm = ScriptedLlm::new(|stage, _| {
        Ok(match stage {
            Stage::Planner => hybrid_plan_reply("dell"),
            Stage::Critic => critic_reply(0.35),
            Stage::Synthesizer => LONG_ANSWER.to_string(),
        })
    });
    let agent = fixture.agent(llm.clone());

    let response = agent.query("Tell me about Dell").await;

    assert_eq!(response.retries, 2);
    assert_eq!(llm.calls(Stage::Planner), 1);
    assert_eq!(llm.calls(Stage::Critic), 3);
    assert_eq!(llm.calls(Stage::Synthesizer), 1);
    assert!(response.feedback.needs_retry);
    assert!(response.plan.fallback_to_hybrid);
    match &response.plan.tools_to_use[..] {
        [ToolCall::HybridSearch(params)] => assert_eq!(params.top_k, Some(10)),
        other => panic!("unexpected retry plan {:?}", other),
    }
    assert_eq!(response.answer, LONG_ANSWER);
}

#[tokio::test]
async fn test_retry_broadens_despite_narrow_suggestion() {
    let fixture = Fixture::new(llm_settings());
    let llm = ScriptedLlm::new(|stage, _| {
        Ok(match stage {
            Stage::Planner => hybrid_plan_reply("dell"),
            Stage::Critic => json!({"confidence": 0.1, "retry_tool": "facts_lookup"}).to_string(),
            Stage::Synthesizer => LONG_ANSWER.to_string(),
        })
    });
    let agent = fixture.agent(llm.clone());

    let response = agent.query("What skills are needed at Dell?").await;

    assert_eq!(response.retries, 2);
    match &response.plan.tools_to_use[..] {
        [ToolCall::HybridSearch(params)] => {
            assert_eq!(params.top_k, Some(10));
            assert_eq!(params.companies, vec!["dell".to_string()]);
        }
        other => panic!("unexpected retry plan {:?}", other),
    }
    assert!(response.feedback.reasoning.contains("suggested facts_lookup"));
}

#[tokio::test]
async fn test_confidence_at_threshold_does_not_retry() {
    let fixture = Fixture::new(llm_settings());
    let llm = ScriptedLlm::new(|stage, _| {
        Ok(match stage {
            Stage::Planner => hybrid_plan_reply("dell"),
            Stage::Critic => critic_reply(0.45),
            Stage::Synthesizer => LONG_ANSWER.to_string(),
        })
    });
    let agent = fixture.agent(llm.clone());

    let response = agent.query("Tell me about Dell").await;

    assert_eq!(response.retries, 0);
    assert_eq!(llm.calls(Stage::Critic), 1);
    assert!(!response.feedback.needs_retry);
    assert!(!response.plan.fallback_to_hybrid);
}

#[tokio::test]
async fn test_retry_limit_respected_when_disabled() {
    let mut settings = llm_settings();
    settings.max_retries = 0;
    let fixture = Fixture::new(settings);
    let llm = ScriptedLlm::new(|stage, _| {
        Ok(match stage {
            Stage::Planner => hybrid_plan_reply("dell"),
            Stage::Critic => critic_reply(0.1),
            Stage::Synthesizer => LONG_ANSWER.to_string(),
        })
    });
    let agent = fixture.agent(llm.clone());

    let response = agent.query("Tell me about Dell").await;
    assert_eq!(response.retries, 0);
    assert_eq!(llm.calls(Stage::Critic), 1);
}

#[tokio::test]
async fn test_short_llm_answer_replaced() {
    let fixture = Fixture::new(llm_settings());
    let llm = ScriptedLlm::new(|stage, _| {
        Ok(match stage {
            Stage::Planner => hybrid_plan_reply("dell"),
            Stage::Critic => critic_reply(0.9),
            Stage::Synthesizer => "Dell is good.".to_string(),
        })
    });
    let agent = fixture.agent(llm.clone());

    let response = agent.query("What is the selection process at Dell?").await;

    assert_ne!(response.answer, "Dell is good.");
    assert!(response.answer.contains("## DELL"));
    assert_eq!(llm.calls(Stage::Synthesizer), 1);
}

#[tokio::test]
async fn test_unknown_tool_recorded_as_error() {
    let fixture = Fixture::new(llm_settings());
    let llm = ScriptedLlm::new(|stage, _| {
        Ok(match stage {
            Stage::Planner => json!({
                "intent": "general",
                "tool": {"name": "web_search", "params": {"q": "dell"}}
            })
            .to_string(),
            Stage::Critic => critic_reply(0.9),
            Stage::Synthesizer => LONG_ANSWER.to_string(),
        })
    });
    let agent = fixture.agent(llm.clone());

    let response = agent.query("Tell me about Dell").await;

    assert!(response
        .execution
        .errors
        .contains(&"Unknown tool: web_search".to_string()));
    assert!(response.execution.tool_results.is_empty());
    // Enrichment still runs for the detected company
    assert!(response.execution.enriched_results.as_ref().unwrap().contains_key("Dell"));
}

#[tokio::test]
async fn test_blank_query_is_rejected() {
    let fixture = Fixture::new(llm_settings());
    let llm = ScriptedLlm::offline();
    let agent = fixture.agent(llm.clone());

    let response = agent.query("  ").await;
    assert!(!response.execution.success);
    assert_eq!(response.feedback.confidence_score, 0.0);
    assert_eq!(llm.calls(Stage::Planner), 0);
}

#[tokio::test]
async fn test_response_serializes() {
    let fixture = Fixture::new(AgentSettings::rule_based());
    let agent = fixture.agent(ScriptedLlm::offline());

    let response = agent.query("Compare Acme and Cedar").await;
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["plan"]["intent"], "comparison");
    assert!(value["answered_at"].is_string());
    assert_eq!(value["retries"], 0);
}
