//! Embedding strategies and the assets they depend on

pub mod assets;
pub mod lazy;
pub mod onnx_embedder;
pub mod static_vectors;

use std::sync::Arc;

use crate::config::{EmbeddingConfig, EmbeddingStrategy};
use crate::providers::EmbeddingBackend;

pub use assets::{AssetFetcher, AssetKind, AssetSpec};
pub use lazy::LazyEmbedder;
pub use onnx_embedder::OnnxEmbedder;
pub use static_vectors::StaticVectorEmbedder;

/// Build the configured strategy behind a lazy wrapper
///
/// Nothing is downloaded or loaded until the first embedding call or an
/// explicit [`LazyEmbedder::warm_up`].
pub fn build_backend(config: &EmbeddingConfig) -> Arc<LazyEmbedder> {
    let name = match config.strategy {
        EmbeddingStrategy::Dense => "onnx",
        EmbeddingStrategy::Static => "static",
    };
    let dimensions = config.output_dimensions();
    let config = config.clone();

    Arc::new(LazyEmbedder::new(
        name,
        dimensions,
        Box::new(move || {
            let config = config.clone();
            Box::pin(async move {
                let fetcher = AssetFetcher::new(&config.cache_dir)?;
                let backend: Arc<dyn EmbeddingBackend> = match config.strategy {
                    EmbeddingStrategy::Dense => Arc::new(OnnxEmbedder::new(&config, &fetcher).await?),
                    EmbeddingStrategy::Static => {
                        Arc::new(StaticVectorEmbedder::acquire(&config, &fetcher).await?)
                    }
                };
                Ok(backend)
            })
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_backend_is_lazy() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EmbeddingConfig::default();
        config.strategy = EmbeddingStrategy::Static;
        config.cache_dir = dir.path().to_path_buf();

        let backend = build_backend(&config);
        assert!(!backend.is_initialized());
        assert_eq!(backend.dimensions(), 100);
        assert_eq!(backend.name(), "static");

        // No table on disk and no URL: fails on first use, not at build time
        assert!(backend.warm_up().await.unwrap_err().is_resource_error());
    }

    #[tokio::test]
    async fn test_build_backend_static_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EmbeddingConfig::default();
        config.strategy = EmbeddingStrategy::Static;
        config.cache_dir = dir.path().to_path_buf();
        config.static_vectors.dimensions = 2;
        std::fs::write(
            dir.path().join(&config.static_vectors.file_name),
            "claim 1 0\nsurgery 0 1\n",
        )
        .unwrap();

        let backend = build_backend(&config);
        let v = backend.embed_one("Claim surgery").await.unwrap();
        assert_eq!(v, vec![0.5, 0.5]);
        assert!(backend.is_initialized());
    }

    #[tokio::test]
    async fn test_repeated_batches_after_warm_up_keep_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EmbeddingConfig::default();
        config.strategy = EmbeddingStrategy::Static;
        config.cache_dir = dir.path().to_path_buf();
        config.static_vectors.dimensions = 3;
        std::fs::write(
            dir.path().join(&config.static_vectors.file_name),
            "knee 1 0 0
surgery 0 1 0
covered 0 0 1
",
        )
        .unwrap();

        let backend = build_backend(&config);
        backend.warm_up().await.unwrap();

        let first = backend
            .embed_batch(&["knee surgery".to_string(), "unknown words".to_string()])
            .await
            .unwrap();
        let second = backend
            .embed_batch(&[
                "covered".to_string(),
                String::new(),
                "Knee covered?".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 3);
        assert!(first.iter().chain(&second).all(|v| v.len() == backend.dimensions()));
        assert_eq!(backend.dimensions(), 3);
    }
}
