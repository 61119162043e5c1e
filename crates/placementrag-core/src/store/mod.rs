//! Read-only stores built offline by the ingestion pipeline
//!
//! Both stores are loaded once per process and never mutated afterwards,
//! so they are shared between components as `Arc<dyn ...>`.

mod ann_index;
mod encoder;
mod facts;
mod records;
mod semantic;

pub use ann_index::{cosine_similarity, AnnIndex};
pub use encoder::{ClientEncoder, QueryEncoder};
pub use facts::{FactsIndex, FactsStats};
pub use records::{
    parse_number, AttributeValue, ChunkType, Eligibility, RoleRecord, SelectionRound,
    SemanticChunk, SemanticHit, Stipend, StipendEntry,
};
pub use semantic::{SemanticEntry, SemanticIndex, SemanticIndexFile, SemanticStats};

use crate::error::Result;
use async_trait::async_trait;

/// Structured lookups over role records
pub trait FactsStore: Send + Sync {
    /// Roles for a company: exact (case-insensitive) match first, else partial match either way
    fn get_by_company(&self, company: &str) -> Vec<RoleRecord>;

    /// Distinct company names, sorted
    fn get_all_companies(&self) -> Vec<String>;

    fn get_all_stipends(&self) -> Vec<StipendEntry>;

    fn filter_by_stipend(&self, min: Option<f64>, max: Option<f64>) -> Vec<RoleRecord>;

    /// Roles whose postgraduate CGPA requirement is at most `max`, or that state none
    fn filter_by_cgpa(&self, max: f64) -> Vec<RoleRecord>;

    fn filter_by_location(&self, location: &str) -> Vec<RoleRecord>;

    fn filter_by_branch(&self, branch: &str) -> Vec<RoleRecord>;

    fn search_attribute(&self, attribute: &str, companies: Option<&[String]>)
        -> Vec<AttributeValue>;

    fn all_records(&self) -> Vec<RoleRecord>;
}

/// Deepest result list a semantic search returns
pub const MAX_TOP_K: usize = 50;

/// Candidates fetched per requested hit when filters apply after retrieval
pub(crate) const FILTER_OVERFETCH: usize = 5;

/// Parameters for a nearest-neighbour chunk search
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticQuery {
    pub query: String,
    pub top_k: usize,
    /// Case-insensitive substring filter on the chunk's company
    pub company: Option<String>,
    pub chunk_type: Option<ChunkType>,
    /// Minimum cosine similarity
    pub threshold: f32,
}

impl SemanticQuery {
    /// `top_k` is capped at [`MAX_TOP_K`]
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k: top_k.min(MAX_TOP_K),
            company: None,
            chunk_type: None,
            threshold: 0.0,
        }
    }

    pub fn company(mut self, company: Option<String>) -> Self {
        self.company = company;
        self
    }

    pub fn chunk_type(mut self, chunk_type: Option<ChunkType>) -> Self {
        self.chunk_type = chunk_type;
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn is_filtered(&self) -> bool {
        self.company.is_some() || self.chunk_type.is_some()
    }
}

/// Vector search over categorized text chunks
#[async_trait]
pub trait SemanticStore: Send + Sync {
    async fn search(&self, query: &SemanticQuery) -> Result<Vec<SemanticHit>>;

    /// Every chunk whose company contains `company` (case-insensitive)
    fn get_all_by_company(&self, company: &str) -> Vec<SemanticChunk>;
}
