//! Shared LLM handle for the planner, critic and synthesizer

use super::json_extract::extract_json_object;
use super::{ChatMessage, LLMClient};
use crate::error::{PlacementError, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Injected LLM access for agent components
///
/// Built once by the caller and cloned into each component; clones share the
/// underlying client (and therefore its cache and metrics).
#[derive(Clone)]
pub struct AgentLlm {
    client: Arc<dyn LLMClient>,
    timeout: Duration,
}

impl AgentLlm {
    pub fn new(client: Arc<dyn LLMClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn client(&self) -> &Arc<dyn LLMClient> {
        &self.client
    }

    /// Free-text completion. Empty output is reported as an error.
    pub async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        generate_text(self.client.as_ref(), system, prompt, self.timeout).await
    }

    /// Completion parsed as a JSON object; `None` on any failure
    pub async fn generate_json(&self, system: &str, prompt: &str) -> Option<Map<String, Value>> {
        generate_json(self.client.as_ref(), system, prompt, self.timeout).await
    }
}

/// Run one system + user completion bounded by `timeout`
pub async fn generate_text(
    client: &dyn LLMClient,
    system: &str,
    prompt: &str,
    timeout: Duration,
) -> Result<String> {
    let messages = vec![ChatMessage::system(system), ChatMessage::user(prompt)];

    let response = tokio::time::timeout(timeout, client.chat_completion(messages))
        .await
        .map_err(|_| {
            PlacementError::Llm(format!("LLM call timed out after {}s", timeout.as_secs()))
        })??;

    let response = response.trim();
    if response.is_empty() {
        return Err(PlacementError::Llm("Empty response from LLM".to_string()));
    }
    Ok(response.to_string())
}

/// Best-effort completion parsed through the JSON extraction chain
pub async fn generate_json(
    client: &dyn LLMClient,
    system: &str,
    prompt: &str,
    timeout: Duration,
) -> Option<Map<String, Value>> {
    match generate_text(client, system, prompt, timeout).await {
        Ok(text) => {
            let parsed = extract_json_object(&text);
            if parsed.is_none() {
                tracing::warn!("LLM response did not contain a JSON object");
            }
            parsed
        }
        Err(e) => {
            tracing::warn!("LLM generation failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(&'static str);

    #[async_trait]
    impl LLMClient for Fixed {
        async fn chat_completion(&self, _messages: Vec<ChatMessage>) -> Result<String> {
            Ok(self.0.to_string())
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(PlacementError::Llm("no embeddings".into()))
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct Slow;

    #[async_trait]
    impl LLMClient for Slow {
        async fn chat_completion(&self, _messages: Vec<ChatMessage>) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("{}".to_string())
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![])
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_generate_json_from_fenced_reply() {
        let llm = AgentLlm::new(
            Arc::new(Fixed("```json\n{\"intent\": \"general\",}\n```")),
            Duration::from_secs(5),
        );
        let obj = llm.generate_json("sys", "prompt").await.unwrap();
        assert_eq!(obj["intent"], "general");
    }

    #[tokio::test]
    async fn test_blank_reply_is_error() {
        let llm = AgentLlm::new(Arc::new(Fixed("   \n")), Duration::from_secs(5));
        assert!(llm.generate("sys", "prompt").await.is_err());
        assert!(llm.generate_json("sys", "prompt").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let llm = AgentLlm::new(Arc::new(Slow), Duration::from_secs(1));
        let err = llm.generate("sys", "prompt").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
