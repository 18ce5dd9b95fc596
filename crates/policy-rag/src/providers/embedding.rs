//! Embedding backend trait for turning text into vectors

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OnnxEmbedder`: dense sentence encoder (all-MiniLM-L6-v2 by default)
/// - `StaticVectorEmbedder`: averaged word vectors (GloVe text format)
/// - `LazyEmbedder`: defers either of the above until first use
///
/// Every vector returned by one instance has length `dimensions()`.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for multiple texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate embedding for a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("Backend returned no embedding"))
    }

    /// Embedding dimensions
    fn dimensions(&self) -> usize;

    /// Backend name for logging
    fn name(&self) -> &str;
}
