//! Semantic chunk index: chunk metadata plus embeddings, searched by cosine similarity

use super::ann_index::{cosine_similarity, AnnIndex};
use super::records::{ChunkType, SemanticChunk, SemanticHit};
use super::encoder::QueryEncoder;
use super::{SemanticQuery, SemanticStore, FILTER_OVERFETCH, MAX_TOP_K};
use crate::error::{PlacementError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

/// On-disk layout of the semantic index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticIndexFile {
    /// Embedding model the vectors were produced with
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub dimensions: usize,
    pub entries: Vec<SemanticEntry>,
}

/// A chunk and its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticEntry {
    #[serde(flatten)]
    pub chunk: SemanticChunk,
    pub embedding: Vec<f32>,
}

pub struct SemanticIndex {
    entries: Vec<SemanticEntry>,
    ann: AnnIndex,
    encoder: Arc<dyn QueryEncoder>,
    model: String,
    dimensions: usize,
}

impl SemanticIndex {
    /// Load an index file; queries are embedded with `encoder`
    pub fn load(path: &Path, encoder: Arc<dyn QueryEncoder>) -> Result<Self> {
        if !path.exists() {
            return Err(PlacementError::DataNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let file: SemanticIndexFile = serde_json::from_str(&content)
            .map_err(|e| PlacementError::malformed(path, e))?;

        if !file.model.is_empty() && file.model != encoder.model() {
            tracing::warn!(
                "Semantic index built with {} but queries use {}",
                file.model,
                encoder.model()
            );
        }

        let index = Self::from_file(file, encoder);
        tracing::info!(
            "Loaded {} semantic chunks from {}",
            index.entries.len(),
            path.display()
        );
        Ok(index)
    }

    pub fn from_file(file: SemanticIndexFile, encoder: Arc<dyn QueryEncoder>) -> Self {
        let dimensions = if file.dimensions > 0 {
            file.dimensions
        } else {
            file.entries.first().map_or(0, |e| e.embedding.len())
        };

        let total = file.entries.len();
        let entries: Vec<SemanticEntry> = file
            .entries
            .into_iter()
            .filter(|e| e.embedding.len() == dimensions)
            .collect();
        if entries.len() < total {
            tracing::warn!(
                "Dropped {} chunks whose embedding is not {}-dimensional",
                total - entries.len(),
                dimensions
            );
        }

        let ann = AnnIndex::build(entries.iter().map(|e| e.embedding.as_slice()));

        Self {
            entries,
            ann,
            encoder,
            model: file.model,
            dimensions,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> SemanticStats {
        let mut chunks_by_type: BTreeMap<ChunkType, usize> = BTreeMap::new();
        let mut companies = BTreeSet::new();
        for entry in &self.entries {
            *chunks_by_type.entry(entry.chunk.chunk_type).or_default() += 1;
            companies.insert(entry.chunk.company.as_str());
        }

        SemanticStats {
            total_chunks: self.entries.len(),
            total_companies: companies.len(),
            chunks_by_type,
            model: self.model.clone(),
            dimensions: self.dimensions,
            ann_index: self.ann.is_built(),
        }
    }

    /// Best `k` entry positions by similarity, highest first
    fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.ann.is_built() {
            return self.ann.search(query, k);
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, e)| (pos, cosine_similarity(query, &e.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored
    }
}

#[async_trait]
impl SemanticStore for SemanticIndex {
    async fn search(&self, query: &SemanticQuery) -> Result<Vec<SemanticHit>> {
        if query.query.trim().is_empty() || query.top_k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.encoder.encode(&query.query).await?;
        if vector.len() != self.dimensions {
            return Err(PlacementError::Search(format!(
                "Query embedding has {} dimensions, index has {}",
                vector.len(),
                self.dimensions
            )));
        }

        let top_k = query.top_k.min(MAX_TOP_K);
        // Filters are applied after retrieval, so over-fetch to leave room for them
        let search_k = if query.is_filtered() {
            top_k.saturating_mul(FILTER_OVERFETCH)
        } else {
            top_k
        };
        let company = query.company.as_ref().map(|c| c.to_lowercase());

        let hits: Vec<SemanticHit> = self
            .nearest(&vector, search_k)
            .into_iter()
            .filter(|(_, score)| *score >= query.threshold)
            .map(|(pos, score)| (&self.entries[pos].chunk, score))
            .filter(|(chunk, _)| match &company {
                Some(c) => chunk.company.to_lowercase().contains(c.as_str()),
                None => true,
            })
            .filter(|(chunk, _)| query.chunk_type.map_or(true, |t| chunk.chunk_type == t))
            .take(top_k)
            .map(|(chunk, score)| SemanticHit::from_chunk(chunk, score))
            .collect();

        tracing::debug!(
            "Semantic search '{}' returned {} hits (k={}, filtered={})",
            query.query,
            hits.len(),
            top_k,
            query.is_filtered()
        );
        Ok(hits)
    }

    fn get_all_by_company(&self, company: &str) -> Vec<SemanticChunk> {
        let needle = company.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.chunk.company.to_lowercase().contains(&needle))
            .map(|e| e.chunk.clone())
            .collect()
    }
}

/// Summary numbers for `status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticStats {
    pub total_chunks: usize,
    pub total_companies: usize,
    pub chunks_by_type: BTreeMap<ChunkType, usize>,
    pub model: String,
    pub dimensions: usize,
    pub ann_index: bool,
}
