//! End-to-end orchestration: ingest a document, answer questions against it

use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;

use crate::config::PolicyRagConfig;
use crate::embeddings::build_backend;
use crate::error::{Error, Result};
use crate::fields::{FieldExtractor, Gazetteer};
use crate::generation::DecisionSynthesizer;
use crate::ingestion::{TextChunker, TextExtractor};
use crate::providers::{build_generative, EmbeddingBackend, GenerativeBackend};
use crate::retrieval::rank;
use crate::types::{
    Answer, Decision, DocumentType, IndexedDocument, ParsedFields, RawDocument, ScoredChunk,
};

/// Shared, cheaply cloneable pipeline
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    config: PolicyRagConfig,
    extractor: TextExtractor,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingBackend>,
    fields: FieldExtractor,
    decisions: DecisionSynthesizer,
}

impl Pipeline {
    /// Assemble a pipeline from explicit backends
    ///
    /// Fails when the segmenter's language data or the gazetteer file is missing.
    pub fn new(
        config: PolicyRagConfig,
        embedder: Arc<dyn EmbeddingBackend>,
        generative: Arc<dyn GenerativeBackend>,
    ) -> Result<Self> {
        config.validate()?;

        let chunker = TextChunker::from_config(&config.chunking)?;
        let gazetteer = Gazetteer::load(config.fields.gazetteer_path.as_deref())?;
        let timeout = config.llm.timeout();

        tracing::info!(
            "Pipeline ready (embeddings: {}, generation: {} / {}, top_k: {})",
            embedder.name(),
            generative.name(),
            generative.model(),
            config.retrieval.top_k
        );

        Ok(Self {
            inner: Arc::new(PipelineInner {
                extractor: TextExtractor::from_config(&config.extraction),
                chunker,
                embedder,
                fields: FieldExtractor::with_gazetteer(Arc::clone(&generative), timeout, gazetteer),
                decisions: DecisionSynthesizer::new(generative, timeout),
                config,
            }),
        })
    }

    /// Assemble a pipeline with the backends named in the config
    ///
    /// The embedding backend is lazy: nothing is downloaded until first use.
    pub fn from_config(config: PolicyRagConfig) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingBackend> = build_backend(&config.embeddings);
        let generative = build_generative(&config.llm)?;
        Self::new(config, embedder, generative)
    }

    /// Active configuration
    pub fn config(&self) -> &PolicyRagConfig {
        &self.inner.config
    }

    /// Embedding backend in use
    pub fn embedder(&self) -> &Arc<dyn EmbeddingBackend> {
        &self.inner.embedder
    }

    /// Chunker in use
    pub fn chunker(&self) -> &TextChunker {
        &self.inner.chunker
    }

    /// Extract, chunk and embed a document
    pub async fn ingest(
        &self,
        bytes: &[u8],
        doc_type: DocumentType,
        source_label: &str,
    ) -> Result<IndexedDocument> {
        let limit = self.inner.config.extraction.max_document_bytes;
        if bytes.len() > limit {
            return Err(Error::DocumentTooLarge {
                size: bytes.len(),
                limit,
            });
        }

        let extractor = self.inner.extractor;
        let data = bytes.to_vec();
        let text = tokio::task::spawn_blocking(move || {
            extractor.extract_raw(&RawDocument {
                data: &data,
                doc_type,
            })
        })
            .await
            .map_err(|e| Error::internal(format!("Extraction task panicked: {}", e)))??;

        let chunks = self.inner.chunker.chunk_text(text.as_str());
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.inner.embedder.embed_batch(&texts).await?
        };

        if vectors.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Backend returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        tracing::info!(
            "Ingested '{}' ({}): {} words, {} chunks",
            source_label,
            doc_type,
            text.word_count(),
            chunks.len()
        );

        Ok(IndexedDocument::new(
            source_label,
            doc_type,
            chunks,
            vectors,
            self.inner.embedder.dimensions(),
        ))
    }

    /// Read a file, detect its type, and ingest it under its file name
    pub async fn ingest_file(&self, path: &Path) -> Result<IndexedDocument> {
        let data = tokio::fs::read(path).await?;
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let doc_type = DocumentType::resolve(Some(label.as_str()), None, &data)?;
        self.ingest(&data, doc_type, &label).await
    }

    /// Top-k clauses for a question
    pub async fn retrieve(&self, doc: &IndexedDocument, question: &str) -> Result<Vec<ScoredChunk>> {
        if doc.is_empty() {
            return Ok(Vec::new());
        }
        let query_vector = self.inner.embedder.embed_one(question).await?;
        Ok(rank(
            &query_vector,
            &doc.vectors,
            &doc.chunks,
            self.inner.config.retrieval.top_k,
            &doc.source_label,
        ))
    }

    /// Answer one question
    ///
    /// Field extraction and retrieval run concurrently. Only input and
    /// embedding errors surface; generation failures become degraded decisions.
    pub async fn answer(&self, doc: &IndexedDocument, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::EmptyQuery);
        }

        let (parsed_fields, clauses) = tokio::join!(
            self.inner.fields.extract_fields(question),
            self.retrieve(doc, question)
        );
        let clauses = clauses?;

        let decision = self
            .inner
            .decisions
            .decide(&parsed_fields, &clauses, &doc.source_label)
            .await;

        Ok(Answer {
            question: question.to_string(),
            parsed_fields,
            decision,
        })
    }

    /// Answer several questions concurrently, in input order
    ///
    /// A question that fails gets a degraded answer; the others are unaffected.
    pub async fn answer_all(&self, doc: &IndexedDocument, questions: &[String]) -> Vec<Answer> {
        let answers = join_all(questions.iter().map(|q| self.answer(doc, q))).await;

        questions
            .iter()
            .zip(answers)
            .map(|(question, result)| match result {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::warn!("Question '{}' failed: {}", question, e);
                    Answer {
                        question: question.clone(),
                        parsed_fields: ParsedFields::default(),
                        decision: Decision::degraded(e, Vec::new()),
                    }
                }
            })
            .collect()
    }
}
