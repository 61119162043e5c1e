//! Configuration: YAML file under the user config dir, overridden by environment

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Everything the CLI and agent need to run
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Locations of the pre-built data artifacts
    #[serde(default)]
    pub data: DataConfig,

    /// Chat and embedding endpoints
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    /// Agent pipeline tuning
    #[serde(default)]
    pub agent: AgentSettings,
}

/// Paths to the read-only stores built offline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// JSON array of role records
    #[serde(default = "default_facts_file")]
    pub facts_file: PathBuf,

    /// JSON semantic index (chunk metadata plus embeddings)
    #[serde(default = "default_semantic_index_file")]
    pub semantic_index_file: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            facts_file: default_facts_file(),
            semantic_index_file: default_semantic_index_file(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(crate::DATA_DIR_NAME)
}

fn default_facts_file() -> PathBuf {
    data_dir().join("facts.json")
}

fn default_semantic_index_file() -> PathBuf {
    data_dir().join("semantic_index.json")
}

/// OpenAI-compatible service used for completions and query embeddings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Chat completions base URL, without the `/v1/...` suffix
    pub url: String,

    /// Model name for chat completions (planning, critique, synthesis)
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Embeddings base URL when served separately from chat
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings; must match the model the semantic index was built with
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Expected embedding width; responses of any other width are rejected
    #[serde(default)]
    pub embedding_dimensions: Option<usize>,

    /// Sent as a bearer token when set
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request HTTP timeout, seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature for chat completions
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion token limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LLMServiceConfig {
    /// `embedding_url`, or the chat URL when unset
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("PLACEMENTRAG_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            model: default_chat_model(),
            embedding_url: std::env::var("PLACEMENTRAG_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: std::env::var("PLACEMENTRAG_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok()),
            api_key: std::env::var("PLACEMENTRAG_LLM_API_KEY").ok(),
            timeout_secs: default_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_chat_model() -> String {
    std::env::var("PLACEMENTRAG_LLM_MODEL")
        .unwrap_or_else(|_| "Qwen/Qwen2.5-7B-Instruct".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("PLACEMENTRAG_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "sentence-transformers/all-MiniLM-L6-v2".to_string())
}

fn default_timeout() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    2048
}

/// Knobs for the plan/execute/critique/synthesize loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_true")]
    pub use_llm_planner: bool,

    #[serde(default = "default_true")]
    pub use_llm_critic: bool,

    #[serde(default = "default_true")]
    pub use_llm_synthesizer: bool,

    /// Additional execute/critique cycles allowed after the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Critic confidence below which a retry is requested
    #[serde(default = "default_retry_threshold")]
    pub retry_threshold: f64,

    /// LLM answers shorter than this are replaced by the rule-based renderer
    #[serde(default = "default_min_answer_chars")]
    pub min_answer_chars: usize,

    /// Minimum cosine similarity for semantic hits
    #[serde(default = "default_semantic_threshold")]
    pub semantic_threshold: f32,

    /// top_k used by the coarsened retry plan
    #[serde(default = "default_retry_top_k")]
    pub retry_top_k: usize,

    /// Upper bound on a single agent LLM call
    #[serde(default = "default_llm_timeout")]
    pub llm_timeout_secs: u64,
}

impl AgentSettings {
    /// Settings with every LLM-backed component switched to its rule-based path
    pub fn rule_based() -> Self {
        Self {
            use_llm_planner: false,
            use_llm_critic: false,
            use_llm_synthesizer: false,
            ..Self::default()
        }
    }

    /// Whether any component wants an LLM client
    pub fn uses_llm(&self) -> bool {
        self.use_llm_planner || self.use_llm_critic || self.use_llm_synthesizer
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            use_llm_planner: true,
            use_llm_critic: true,
            use_llm_synthesizer: true,
            max_retries: default_max_retries(),
            retry_threshold: default_retry_threshold(),
            min_answer_chars: default_min_answer_chars(),
            semantic_threshold: default_semantic_threshold(),
            retry_top_k: default_retry_top_k(),
            llm_timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_threshold() -> f64 {
    0.4
}

fn default_min_answer_chars() -> usize {
    50
}

fn default_semantic_threshold() -> f32 {
    0.2
}

fn default_retry_top_k() -> usize {
    10
}

fn default_llm_timeout() -> u64 {
    60
}

impl Config {
    /// Read the config file if present, else defaults
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Config::default()
        };
        Ok(config.with_env_overrides())
    }

    /// Load config from an explicit YAML file
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// `<config dir>/placementrag/config.yml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Environment variables win over the file for data locations
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("PLACEMENTRAG_FACTS_FILE") {
            self.data.facts_file = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("PLACEMENTRAG_SEMANTIC_INDEX") {
            self.data.semantic_index_file = PathBuf::from(path);
        }
        self
    }
}
