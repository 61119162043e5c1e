//! Optional HNSW graph over chunk embeddings
//!
//! Small indexes are scanned exhaustively by the semantic store; the graph
//! only pays off once the chunk count reaches [`ANN_THRESHOLD`].

use super::{FILTER_OVERFETCH, MAX_TOP_K};
use instant_distance::{Builder, HnswMap, Search};

pub const ANN_THRESHOLD: usize = 1000;

/// Cosine similarity; 0.0 for mismatched or zero-length vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (mut dot, mut aa, mut bb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        aa += x * x;
        bb += y * y;
    }

    let denom = aa.sqrt() * bb.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[derive(Clone)]
struct ChunkVector(Vec<f32>);

impl instant_distance::Point for ChunkVector {
    fn distance(&self, other: &Self) -> f32 {
        1.0 - cosine_similarity(&self.0, &other.0)
    }
}

enum Layout {
    /// Too few chunks for a graph
    Exhaustive { len: usize },
    Graph {
        map: Box<HnswMap<ChunkVector, usize>>,
        len: usize,
    },
}

/// Maps chunk embeddings to their position in the entry list
pub struct AnnIndex(Layout);

impl AnnIndex {
    pub fn build<'a, I>(vectors: I) -> Self
    where
        I: IntoIterator<Item = &'a [f32]>,
    {
        let points: Vec<ChunkVector> = vectors
            .into_iter()
            .map(|v| ChunkVector(v.to_vec()))
            .collect();
        let len = points.len();

        if len < ANN_THRESHOLD {
            tracing::debug!(chunks = len, "Chunk count below ANN threshold, using exact scan");
            return Self(Layout::Exhaustive { len });
        }

        let positions: Vec<usize> = (0..len).collect();
        // A search yields at most `ef_search` candidates; size it for the deepest filtered fetch
        let map = Builder::default()
            .ef_search(MAX_TOP_K * FILTER_OVERFETCH)
            .build(points, positions);
        tracing::info!(chunks = len, "Built HNSW graph over chunk embeddings");

        Self(Layout::Graph {
            map: Box::new(map),
            len,
        })
    }

    /// Up to `k` (position, cosine similarity) pairs; empty without a graph
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let Layout::Graph { map, .. } = &self.0 else {
            return Vec::new();
        };

        let probe = ChunkVector(query.to_vec());
        let mut search = Search::default();
        map.search(&probe, &mut search)
            .take(k)
            .map(|hit| (*hit.value, 1.0 - hit.distance))
            .collect()
    }

    pub fn is_built(&self) -> bool {
        matches!(self.0, Layout::Graph { .. })
    }

    pub fn len(&self) -> usize {
        match self.0 {
            Layout::Exhaustive { len } | Layout::Graph { len, .. } => len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
