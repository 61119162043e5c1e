//! Shared fixtures for pipeline integration tests
//!
//! Stores are written to a temp directory and loaded through the same path
//! the CLI uses. Query embeddings come from a fixed-vocabulary bag of words
//! so similarity is deterministic.

#![allow(dead_code)]

use async_trait::async_trait;
use placementrag_core::agent::{critic, planner, synthesizer};
use placementrag_core::error::{PlacementError, Result};
use placementrag_core::{AgentSettings, ChatMessage, Config, LLMClient, PlacementAgent};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const VOCAB: [&str; 16] = [
    "dell",
    "intel",
    "acme",
    "birch",
    "cedar",
    "interview",
    "selection",
    "rounds",
    "skills",
    "programming",
    "technical",
    "culture",
    "company",
    "responsibilities",
    "python",
    "hardware",
];

pub const EMBEDDING_MODEL: &str = "bag-of-words";

pub fn bag_of_words(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    VOCAB
        .iter()
        .map(|w| lower.matches(w).count() as f32)
        .collect()
}

fn role(company: &str, title: &str, stipend: u32, cgpa: &str, city: &str) -> Value {
    json!({
        "primary_key": format!("{}_{}", company.to_lowercase(), stipend),
        "company_name": company,
        "role_title": title,
        "stipend_salary": {"amount": stipend.to_string(), "currency": "INR", "period": "per month"},
        "duration": "6 months",
        "location": [city],
        "work_mode": "On-site",
        "eligibility": {"cgpa_pg": cgpa, "branches": ["CSE", "ECE", "EEE"]},
        "selection_process": [
            {"round": 1, "name": "Online assessment", "details": "Aptitude and coding"},
            {"round": 2, "name": "Technical interview", "details": ""}
        ],
        "batch_year": "2025"
    })
}

pub fn facts_json() -> Value {
    json!([
        role("Acme", "Data Analyst Intern", 30000, "6.5", "Pune"),
        role("Birch", "Backend Intern", 45000, "7.0", "Bangalore"),
        role("Cedar", "ML Intern", 50000, "8.0", "Hyderabad"),
        role("Dell", "Software Engineer Intern", 38000, "7.5", "Bangalore"),
        role("Intel", "Hardware Validation Intern", 35000, "7.0", "Bangalore"),
    ])
}

fn entry(company: &str, kind: &str, text: &str) -> Value {
    let embedding = bag_of_words(&format!("{} {}", company, text));
    json!({
        "chunk_id": format!("{}_{}", company.to_lowercase(), kind),
        "primary_key": format!("{}_intern", company.to_lowercase()),
        "company": company,
        "role": "Intern",
        "type": kind,
        "text": text,
        "source": format!("{}.pdf", company.to_lowercase()),
        "embedding": embedding,
    })
}

pub fn semantic_json() -> Value {
    json!({
        "model": EMBEDDING_MODEL,
        "dimensions": VOCAB.len(),
        "entries": [
            entry("Dell", "interview_process", "Two technical interview rounds after an online selection test"),
            entry("Dell", "skills_required", "Python programming skills and technical fundamentals"),
            entry("Dell", "about_company", "Dell company culture values ownership"),
            entry("Intel", "skills_required", "Hardware design skills, Verilog and technical depth"),
            entry("Intel", "roles_responsibilities", "Responsibilities include hardware validation"),
            entry("Birch", "interview_process", "Single interview with the backend team"),
        ],
    })
}

/// Temp directory holding the facts file and semantic index
pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
}

impl Fixture {
    pub fn new(settings: AgentSettings) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let facts = dir.path().join("facts.json");
        let semantic = dir.path().join("semantic_index.json");
        write_json(&facts, &facts_json());
        write_json(&semantic, &semantic_json());

        let mut config = Config::default();
        config.data.facts_file = facts;
        config.data.semantic_index_file = semantic;
        config.agent = settings;
        Self { dir, config }
    }

    pub fn agent(&self, llm: Arc<ScriptedLlm>) -> PlacementAgent {
        PlacementAgent::from_config(&self.config, llm).unwrap()
    }
}

fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planner,
    Critic,
    Synthesizer,
}

type Responder = Box<dyn Fn(Stage, &str) -> Result<String> + Send + Sync>;

/// LLM double: embeddings by bag of words, completions from a closure keyed by stage
pub struct ScriptedLlm {
    respond: Responder,
    planner_calls: AtomicUsize,
    critic_calls: AtomicUsize,
    synthesizer_calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new(respond: impl Fn(Stage, &str) -> Result<String> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            planner_calls: AtomicUsize::new(0),
            critic_calls: AtomicUsize::new(0),
            synthesizer_calls: AtomicUsize::new(0),
        })
    }

    /// Completions always fail; only embeddings work
    pub fn offline() -> Arc<Self> {
        Self::new(|_, _| Err(PlacementError::Llm("connection refused".into())))
    }

    pub fn calls(&self, stage: Stage) -> usize {
        match stage {
            Stage::Planner => self.planner_calls.load(Ordering::SeqCst),
            Stage::Critic => self.critic_calls.load(Ordering::SeqCst),
            Stage::Synthesizer => self.synthesizer_calls.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl LLMClient for ScriptedLlm {
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let system = messages.first().map(|m| m.content.as_str()).unwrap_or("");
        let stage = if system == planner::SYSTEM_PROMPT {
            Stage::Planner
        } else if system == critic::SYSTEM_PROMPT {
            Stage::Critic
        } else if system == synthesizer::SYSTEM_PROMPT {
            Stage::Synthesizer
        } else {
            return Err(PlacementError::Llm(format!("unexpected system prompt: {}", system)));
        };

        let counter = match stage {
            Stage::Planner => &self.planner_calls,
            Stage::Critic => &self.critic_calls,
            Stage::Synthesizer => &self.synthesizer_calls,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        (self.respond)(stage, prompt)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn embedding_model(&self) -> &str {
        EMBEDDING_MODEL
    }
}

pub const LONG_ANSWER: &str =
    "Dell runs two technical interview rounds after an online selection test, per the provided data.";

pub fn llm_settings() -> AgentSettings {
    AgentSettings {
        llm_timeout_secs: 5,
        ..AgentSettings::default()
    }
}
