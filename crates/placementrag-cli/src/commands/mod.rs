//! CLI command handlers

pub mod ask;
pub mod chat;
pub mod companies;
pub mod status;

use anyhow::Result;
use placementrag_core::{AgentSettings, Config, LLMClient, PlacementAgent, VLLMClient};
use std::sync::Arc;

/// Agent plus the concrete client, kept for its metrics
pub struct Session {
    pub agent: PlacementAgent,
    pub client: Arc<VLLMClient>,
}

impl Session {
    pub fn open(config: &Config, no_llm: bool) -> Result<Self> {
        let mut config = config.clone();
        if no_llm {
            config.agent = AgentSettings {
                use_llm_planner: false,
                use_llm_critic: false,
                use_llm_synthesizer: false,
                ..config.agent
            };
        }

        let client = Arc::new(VLLMClient::new(config.llm_service.clone())?);
        let agent = PlacementAgent::from_config(&config, client.clone() as Arc<dyn LLMClient>)?;
        Ok(Self { agent, client })
    }

    /// Metrics are only worth showing when some stage talks to the LLM
    pub fn llm_in_use(&self) -> bool {
        self.agent.settings().uses_llm()
    }
}
