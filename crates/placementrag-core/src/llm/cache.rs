//! TTL cache for LLM completions and query embeddings
//!
//! Agent prompts are deterministic for a given query and evidence set, so
//! repeated questions in a chat session hit the cache instead of the service.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;
use std::time::{Duration, Instant};

const DEFAULT_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_CAPACITY: usize = 1024;

struct CacheEntry {
    value: String,
    inserted_at: Instant,
}

/// Bounded in-memory cache keyed by request fingerprint
pub struct LLMCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl LLMCache {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    pub fn with_limits(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Cached value if present and younger than the TTL
    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Insert a value, evicting expired entries and then the oldest one when full
    pub fn insert(&self, key: String, value: String) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let ttl = self.ttl;
            entries.retain(|_, e| e.inserted_at.elapsed() < ttl);

            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn stats(&self) -> CacheStats {
        match self.entries.read() {
            Ok(entries) => {
                let live = entries
                    .values()
                    .filter(|e| e.inserted_at.elapsed() < self.ttl)
                    .count();
                CacheStats {
                    entries: entries.len(),
                    live_entries: live,
                    capacity: self.capacity,
                }
            }
            Err(_) => CacheStats::default(),
        }
    }
}

impl Default for LLMCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache occupancy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub live_entries: usize,
    pub capacity: usize,
}

fn fingerprint(kind: &str, model: &str, payload: &str) -> String {
    let mut hasher = DefaultHasher::new();
    model.hash(&mut hasher);
    payload.hash(&mut hasher);
    format!("{}:{}:{:x}", kind, model, hasher.finish())
}

/// Key for a chat completion request (serialized messages plus sampling params)
pub fn chat_cache_key(model: &str, request: &str) -> String {
    fingerprint("chat", model, request)
}

/// Key for a single text embedding
pub fn embedding_cache_key(model: &str, text: &str) -> String {
    fingerprint("embed", model, text)
}
