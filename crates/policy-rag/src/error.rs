//! Error types for the policy Q&A pipeline

use std::time::Duration;

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
///
/// Variants fall into three groups: input errors (the caller sent something
/// unusable), resource errors (the environment is not provisioned), and
/// external-dependency errors (the generative backend misbehaved). The last
/// group never escapes the field extractor or the decision synthesizer.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Declared document type is not one we can read
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Document content is corrupt or unreadable
    #[error("Failed to extract text from {format} document: {message}")]
    ExtractionFailure { format: String, message: String },

    /// Document exceeds the configured size limit
    #[error("Document is {size} bytes, limit is {limit} bytes")]
    DocumentTooLarge { size: usize, limit: usize },

    /// Question text is missing or blank
    #[error("Query is empty")]
    EmptyQuery,

    /// Sentence segmentation data for the requested language is unavailable
    #[error("Sentence segmentation resources missing: {0}")]
    SegmentationResourceMissing(String),

    /// Embedding model or vector table could not be acquired or verified
    #[error("Failed to acquire asset '{asset}': {message}")]
    AssetAcquisitionFailure { asset: String, message: String },

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Generative backend did not answer in time
    #[error("Generative backend timed out after {0:?}")]
    GenerationTimeout(Duration),

    /// Generative backend returned an error or an unusable response
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an extraction failure for the given format
    pub fn extraction(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExtractionFailure {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Create an asset acquisition failure
    pub fn asset(asset: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AssetAcquisitionFailure {
            asset: asset.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for errors caused by what the caller sent
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_)
                | Self::ExtractionFailure { .. }
                | Self::DocumentTooLarge { .. }
                | Self::EmptyQuery
        )
    }

    /// True for errors caused by an unprovisioned environment
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            Self::SegmentationResourceMissing(_) | Self::AssetAcquisitionFailure { .. }
        )
    }

    /// True for generative backend failures (timeouts included)
    pub fn is_generation_error(&self) -> bool {
        matches!(self, Self::GenerationTimeout(_) | Self::Llm(_) | Self::Http(_))
    }
}
