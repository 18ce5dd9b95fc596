//! Once-initialized embedding backend
//!
//! Model loading is slow and may download assets, so it happens on first
//! use (or on an explicit `warm_up`). Concurrent first callers share one
//! initialization. A failed initialization is not cached and is retried by
//! the next caller.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::providers::EmbeddingBackend;

/// Builds the real backend when first needed
pub type BackendFactory =
    Box<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn EmbeddingBackend>>> + Send + Sync>;

/// Lazily initialized embedding backend
pub struct LazyEmbedder {
    cell: OnceCell<Arc<dyn EmbeddingBackend>>,
    factory: BackendFactory,
    name: String,
    dimensions: usize,
}

impl LazyEmbedder {
    /// Create a lazy wrapper; `dimensions` must match what the factory builds
    pub fn new(name: impl Into<String>, dimensions: usize, factory: BackendFactory) -> Self {
        Self {
            cell: OnceCell::new(),
            factory,
            name: name.into(),
            dimensions,
        }
    }

    /// Get the backend, initializing it at most once
    pub async fn get(&self) -> Result<&Arc<dyn EmbeddingBackend>> {
        self.cell
            .get_or_try_init(|| async {
                tracing::info!("Initializing {} embedding backend", self.name);
                (self.factory)().await
            })
            .await
    }

    /// Force initialization before serving requests
    pub async fn warm_up(&self) -> Result<()> {
        self.get().await.map(|_| ())
    }

    /// Whether the backend has been initialized
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

#[async_trait]
impl EmbeddingBackend for LazyEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.get().await?.embed_batch(texts).await
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.get().await?.embed_one(text).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.name
    }
}
