//! Configuration for the policy Q&A pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyRagConfig {
    /// Text extraction limits
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Generative backend configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Field extraction configuration
    #[serde(default)]
    pub fields: FieldsConfig,
}

impl PolicyRagConfig {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml(&raw)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (no environment overrides)
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::config(format!("Invalid config: {}", e)))
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `POLICY_RAG_*` environment overrides
    ///
    /// The API key falls back to `GROQ_API_KEY` so existing deployments keep working.
    pub fn apply_env(&mut self) {
        if let Some(key) = env_var("POLICY_RAG_API_KEY").or_else(|| env_var("GROQ_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = env_var("POLICY_RAG_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = env_var("POLICY_RAG_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(dir) = env_var("POLICY_RAG_CACHE_DIR") {
            self.embeddings.cache_dir = PathBuf::from(dir);
        }
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.extraction.max_pages == 0 && self.extraction.max_paragraphs == 0 {
            return Err(Error::config("extraction limits cannot both be zero"));
        }
        if self.chunking.max_words == 0 {
            return Err(Error::config("chunking.max_words must be at least 1"));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::config("embeddings.dimensions must be at least 1"));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::config("embeddings.batch_size must be at least 1"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::config("llm.timeout_secs must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::config("llm.temperature must be within 0.0..=2.0"));
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Text extraction limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum pages read from page-oriented formats (PDF)
    pub max_pages: usize,
    /// Maximum paragraphs read from paragraph-oriented formats (DOCX, text, HTML)
    pub max_paragraphs: usize,
    /// Maximum accepted upload size in bytes (default: 50MB)
    pub max_document_bytes: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_pages: 200,
            max_paragraphs: 500,
            max_document_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Word budget per chunk
    pub max_words: usize,
    /// Language profile for sentence segmentation
    pub language: String,
    /// Extra abbreviations, one per line (optional)
    #[serde(default)]
    pub abbreviations_path: Option<PathBuf>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: 300,
            language: "en".to_string(),
            abbreviations_path: None,
        }
    }
}

/// Which embedding strategy backs the pipeline
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingStrategy {
    /// Pretrained sentence encoder (ONNX)
    #[default]
    Dense,
    /// Averaged static word vectors (GloVe / word2vec text format)
    Static,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Strategy selection
    #[serde(default)]
    pub strategy: EmbeddingStrategy,
    /// Model to use (default: all-MiniLM-L6-v2)
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Maximum sequence length
    pub max_length: usize,
    /// Cache directory for models and vector tables
    pub cache_dir: PathBuf,
    /// Remote ONNX model location
    pub model_url: String,
    /// Remote tokenizer location
    pub tokenizer_url: String,
    /// Expected SHA-256 of the ONNX model (hex), if pinned
    #[serde(default)]
    pub model_sha256: Option<String>,
    /// Static word-vector table settings
    #[serde(default)]
    pub static_vectors: StaticVectorConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let model = "all-MiniLM-L6-v2".to_string();
        Self {
            strategy: EmbeddingStrategy::Dense,
            model_url: format!(
                "https://huggingface.co/sentence-transformers/{}/resolve/main/onnx/model.onnx",
                model
            ),
            tokenizer_url: format!(
                "https://huggingface.co/sentence-transformers/{}/resolve/main/tokenizer.json",
                model
            ),
            model,
            dimensions: 384,
            batch_size: 32,
            max_length: 256,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("policy-rag")
                .join("models"),
            model_sha256: None,
            static_vectors: StaticVectorConfig::default(),
        }
    }
}

impl EmbeddingConfig {
    /// Output dimensionality of the configured strategy
    pub fn output_dimensions(&self) -> usize {
        match self.strategy {
            EmbeddingStrategy::Dense => self.dimensions,
            EmbeddingStrategy::Static => self.static_vectors.dimensions,
        }
    }
}

/// Static word-vector table settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticVectorConfig {
    /// File name inside the cache directory
    pub file_name: String,
    /// Remote location of the table (plain-text format)
    #[serde(default)]
    pub url: Option<String>,
    /// Expected SHA-256 of the table (hex), if pinned
    #[serde(default)]
    pub sha256: Option<String>,
    /// Vector width
    pub dimensions: usize,
}

impl Default for StaticVectorConfig {
    fn default() -> Self {
        Self {
            file_name: "glove.6B.100d.txt".to_string(),
            url: None,
            sha256: None,
            dimensions: 100,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of clauses handed to the decision step
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Generative backend flavour
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProviderKind {
    /// OpenAI-compatible chat completions (Groq, OpenAI, vLLM, ...)
    #[default]
    OpenaiCompat,
    /// Local Ollama server
    Ollama,
}

/// Generative backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend flavour
    #[serde(default)]
    pub provider: LlmProviderKind,
    /// Base URL
    pub base_url: String,
    /// Generation model name
    pub model: String,
    /// API key (OpenAI-compatible backends only)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Temperature for generation
    pub temperature: f32,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::OpenaiCompat,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-70b-8192".to_string(),
            api_key: None,
            temperature: 0.2,
            timeout_secs: 30,
            max_retries: 0,
        }
    }
}

impl LlmConfig {
    /// Per-call timeout
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

/// Field extraction configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldsConfig {
    /// Extra gazetteer entries (TOML with `cities` and `countries` arrays)
    #[serde(default)]
    pub gazetteer_path: Option<PathBuf>,
}
