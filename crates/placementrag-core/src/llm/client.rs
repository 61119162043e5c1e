//! Client for OpenAI-compatible chat and embedding endpoints (vLLM, OpenAI, ...)

use super::cache::{chat_cache_key, embedding_cache_key, CacheStats, LLMCache};
use crate::config::LLMServiceConfig;
use crate::error::{PlacementError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Completion and embedding backend shared by the agent and the semantic store
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String>;

    /// One vector per input text, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| PlacementError::Llm("Embedding service returned nothing".to_string()))
    }

    /// Chat model
    fn model_name(&self) -> &str;

    fn embedding_model(&self) -> &str {
        self.model_name()
    }
}

/// One turn of a chat prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }
}

#[derive(Clone, Copy)]
enum Endpoint {
    Chat,
    Embeddings,
}

impl Endpoint {
    fn label(self) -> &'static str {
        match self {
            Endpoint::Chat => "Chat",
            Endpoint::Embeddings => "Embedding",
        }
    }
}

/// Request counters; latency only covers calls that reached the service
#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    failures: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    latency_ms: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn read(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    fn fail<E>(&self, err: E) -> E {
        Self::bump(&self.failures, 1);
        err
    }

    fn took(&self, started: Instant) {
        Self::bump(&self.latency_ms, started.elapsed().as_millis() as u64);
    }
}

/// Client for a vLLM (or any OpenAI-compatible) deployment
///
/// Chat completions and per-text embeddings are cached, so a chat session
/// that repeats a question does not hit the service again.
pub struct VLLMClient {
    http: reqwest::Client,
    config: LLMServiceConfig,
    cache: LLMCache,
    counters: Counters,
}

impl VLLMClient {
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            config,
            cache: LLMCache::new(),
            counters: Counters::default(),
        })
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        let hits = Counters::read(&self.counters.hits);
        let misses = Counters::read(&self.counters.misses);
        let ratio = |num: f64, den: u64| if den == 0 { 0.0 } else { num / den as f64 };

        MetricsSnapshot {
            total_requests: Counters::read(&self.counters.requests),
            total_errors: Counters::read(&self.counters.failures),
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate: ratio(hits as f64 * 100.0, hits + misses),
            avg_latency_ms: ratio(Counters::read(&self.counters.latency_ms) as f64, misses),
            cache: self.cache.stats(),
        }
    }

    fn url(&self, endpoint: Endpoint) -> String {
        match endpoint {
            Endpoint::Chat => format!("{}/v1/chat/completions", self.config.url),
            Endpoint::Embeddings => format!("{}/v1/embeddings", self.config.embeddings_url()),
        }
    }

    async fn call<B, R>(&self, endpoint: Endpoint, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let mut request = self.http.post(self.url(endpoint)).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.counters.fail(PlacementError::Http(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.counters.fail(PlacementError::Service {
                service: endpoint.label(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }));
        }

        response
            .json()
            .await
            .map_err(|e| self.counters.fail(PlacementError::Http(e)))
    }

    fn check_width(&self, vector: &[f32]) -> Result<()> {
        match self.config.embedding_dimensions {
            Some(expected) if expected != vector.len() => Err(self.counters.fail(
                PlacementError::Llm(format!(
                    "{} returned {}-dimensional embeddings, expected {}",
                    self.config.embedding_model,
                    vector.len(),
                    expected
                )),
            )),
            _ => Ok(()),
        }
    }
}

/// Point-in-time view of the client counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Percentage, 0-100
    pub cache_hit_rate: f64,
    pub avg_latency_ms: f64,
    pub cache: CacheStats,
}

#[async_trait]
impl LLMClient for VLLMClient {
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
        Counters::bump(&self.counters.requests, 1);

        let body = wire::ChatRequest {
            model: &self.config.model,
            messages: &messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let key = chat_cache_key(&self.config.model, &serde_json::to_string(&body)?);

        if let Some(answer) = self.cache.get(&key) {
            tracing::debug!(model = %self.config.model, "Chat completion served from cache");
            Counters::bump(&self.counters.hits, 1);
            return Ok(answer);
        }
        Counters::bump(&self.counters.misses, 1);

        let started = Instant::now();
        let reply: wire::ChatResponse = self.call(Endpoint::Chat, &body).await?;
        self.counters.took(started);

        let answer = reply
            .choices
            .into_iter()
            .map(|c| c.message.content)
            .next()
            .ok_or_else(|| {
                self.counters
                    .fail(PlacementError::Llm("Chat service returned no choices".to_string()))
            })?;

        self.cache.insert(key, answer.clone());
        Ok(answer)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Counters::bump(&self.counters.requests, 1);
        let model = self.config.embedding_model.as_str();

        let mut vectors: Vec<Option<Vec<f32>>> = texts
            .iter()
            .map(|text| {
                self.cache
                    .get(&embedding_cache_key(model, text))
                    .and_then(|json| serde_json::from_str(&json).ok())
            })
            .collect();

        let pending: Vec<usize> = (0..texts.len()).filter(|&i| vectors[i].is_none()).collect();
        Counters::bump(&self.counters.hits, (texts.len() - pending.len()) as u64);
        Counters::bump(&self.counters.misses, pending.len() as u64);

        if !pending.is_empty() {
            tracing::debug!(
                cached = texts.len() - pending.len(),
                fetching = pending.len(),
                "Requesting embeddings"
            );

            let body = wire::EmbeddingRequest {
                model,
                input: pending.iter().map(|&i| texts[i].as_str()).collect(),
            };
            let started = Instant::now();
            let reply: wire::EmbeddingResponse = self.call(Endpoint::Embeddings, &body).await?;
            self.counters.took(started);

            if reply.data.len() != pending.len() {
                return Err(self.counters.fail(PlacementError::Llm(format!(
                    "Asked for {} embeddings, got {}",
                    pending.len(),
                    reply.data.len()
                ))));
            }

            for (i, item) in pending.into_iter().zip(reply.data) {
                self.check_width(&item.embedding)?;
                if let Ok(json) = serde_json::to_string(&item.embedding) {
                    self.cache.insert(embedding_cache_key(model, &texts[i]), json);
                }
                vectors[i] = Some(item.embedding);
            }
        }

        Ok(vectors.into_iter().flatten().collect())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn embedding_model(&self) -> &str {
        &self.config.embedding_model
    }
}

/// Request and response bodies of the OpenAI-compatible API
mod wire {
    use super::ChatMessage;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize)]
    pub struct ChatRequest<'a> {
        pub model: &'a str,
        pub messages: &'a [ChatMessage],
        pub temperature: f32,
        pub max_tokens: u32,
    }

    #[derive(Deserialize)]
    pub struct ChatResponse {
        pub choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    pub struct Choice {
        pub message: ChatMessage,
    }

    #[derive(Serialize)]
    pub struct EmbeddingRequest<'a> {
        pub model: &'a str,
        pub input: Vec<&'a str>,
    }

    #[derive(Deserialize)]
    pub struct EmbeddingResponse {
        pub data: Vec<EmbeddingItem>,
    }

    #[derive(Deserialize)]
    pub struct EmbeddingItem {
        pub embedding: Vec<f32>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_config() -> LLMServiceConfig {
        LLMServiceConfig {
            url: "http://127.0.0.1:9".to_string(),
            embedding_url: None,
            timeout_secs: 1,
            ..LLMServiceConfig::default()
        }
    }

    #[test]
    fn test_chat_message_roles() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
    }

    #[test]
    fn test_fresh_client_metrics() {
        let client = VLLMClient::new(offline_config()).unwrap();
        let metrics = client.metrics();
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.cache_hit_rate, 0.0);
        assert_eq!(metrics.avg_latency_ms, 0.0);
        assert_eq!(metrics.cache.entries, 0);
    }

    #[test]
    fn test_chat_request_shape() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let body = wire::ChatRequest {
            model: "m",
            messages: &messages,
            temperature: 0.1,
            max_tokens: 64,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 64);
    }

    #[test]
    fn test_embedding_width_check() {
        let mut config = offline_config();
        config.embedding_dimensions = Some(3);
        let client = VLLMClient::new(config).unwrap();

        assert!(client.check_width(&[0.0, 1.0, 0.0]).is_ok());
        assert!(client.check_width(&[0.0, 1.0]).is_err());
        assert_eq!(client.metrics().total_errors, 1);
    }

    #[tokio::test]
    async fn test_unreachable_service_counts_failure() {
        let client = VLLMClient::new(offline_config()).unwrap();
        let result = client.chat_completion(vec![ChatMessage::user("hi")]).await;

        assert!(result.is_err());
        let metrics = client.metrics();
        assert_eq!(metrics.total_requests, 1);
        assert_eq!(metrics.cache_misses, 1);
        assert_eq!(metrics.total_errors, 1);
    }
}
