//! Query-side encoding for the semantic store

use crate::config::LLMServiceConfig;
use crate::error::Result;
use crate::llm::{LLMClient, VLLMClient};
use async_trait::async_trait;
use std::sync::Arc;

/// Turns a search query into a vector comparable with the stored chunk embeddings
#[async_trait]
pub trait QueryEncoder: Send + Sync {
    async fn encode(&self, query: &str) -> Result<Vec<f32>>;

    /// Model whose vector space the output lives in.
    /// Compared against the model recorded in the index file.
    fn model(&self) -> &str;
}

/// Encodes queries through the embeddings endpoint of an [`LLMClient`]
pub struct ClientEncoder {
    client: Arc<dyn LLMClient>,
}

impl ClientEncoder {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }

    /// Standalone encoder for callers that have no agent, e.g. `status`
    pub fn from_service(config: LLMServiceConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(VLLMClient::new(config)?)))
    }
}

#[async_trait]
impl QueryEncoder for ClientEncoder {
    async fn encode(&self, query: &str) -> Result<Vec<f32>> {
        self.client.embed(query).await
    }

    fn model(&self) -> &str {
        self.client.embedding_model()
    }
}
