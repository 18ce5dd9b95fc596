//! Exhaustive cosine ranking
//!
//! Documents are small (bounded by the extraction limits), so every chunk is
//! scored; there is no approximate index.

use std::cmp::Ordering;

use crate::types::{Chunk, ScoredChunk};

/// Cosine similarity in [-1, 1]
///
/// Zero-norm inputs and vectors of different lengths score exactly 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Top `k` chunks by descending similarity, ties broken by chunk index
///
/// `chunk_vectors[i]` is the embedding of `chunks[i]`. `k` larger than the
/// number of chunks returns all of them; `k == 0` returns nothing.
pub fn rank(
    query_vector: &[f32],
    chunk_vectors: &[Vec<f32>],
    chunks: &[Chunk],
    k: usize,
    source: &str,
) -> Vec<ScoredChunk> {
    if k == 0 {
        return Vec::new();
    }
    if chunk_vectors.len() != chunks.len() {
        tracing::warn!(
            "{} vectors for {} chunks; ranking the first {}",
            chunk_vectors.len(),
            chunks.len(),
            chunk_vectors.len().min(chunks.len())
        );
    }

    let mut scored: Vec<ScoredChunk> = chunks
        .iter()
        .zip(chunk_vectors.iter())
        .map(|(chunk, vector)| {
            if vector.len() != query_vector.len() {
                tracing::warn!(
                    "Chunk {} has {} dimensions, query has {}; scoring 0",
                    chunk.index,
                    vector.len(),
                    query_vector.len()
                );
            }
            ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(query_vector, vector),
                source: source.to_string(),
            }
        })
        .collect();

    scored.sort_by(compare_scored);
    scored.truncate(k);

    tracing::debug!(
        "Ranked {} chunks, top score {:.4}",
        chunks.len(),
        scored.first().map(|s| s.score).unwrap_or(0.0)
    );

    scored
}

/// Order used by `rank`, exposed for callers merging several rankings
pub fn compare_scored(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.chunk.index.cmp(&b.chunk.index))
}
