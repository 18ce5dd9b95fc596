//! Provider abstractions for embeddings and generation
//!
//! The pipeline only sees `EmbeddingBackend` and `GenerativeBackend`; which
//! implementation sits behind each is decided by configuration.

pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod openai_compat;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

use crate::config::{LlmConfig, LlmProviderKind};
use crate::error::Result;

pub use embedding::EmbeddingBackend;
pub use llm::GenerativeBackend;
pub use ollama::OllamaClient;
pub use openai_compat::OpenAiCompatClient;

/// Build the configured generative backend
pub fn build_generative(config: &LlmConfig) -> Result<Arc<dyn GenerativeBackend>> {
    let backend: Arc<dyn GenerativeBackend> = match config.provider {
        LlmProviderKind::OpenaiCompat => Arc::new(OpenAiCompatClient::new(config)?),
        LlmProviderKind::Ollama => Arc::new(OllamaClient::new(config)?),
    };
    tracing::info!(
        "Generative backend: {} ({})",
        backend.name(),
        backend.model()
    );
    Ok(backend)
}
