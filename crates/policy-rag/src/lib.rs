//! policy-rag: question answering over insurance policy documents
//!
//! A document is extracted into bounded text, split into sentence-aligned
//! chunks and embedded. Each question is embedded and matched against the
//! chunks, its claim fields (age, gender, procedure, location, policy
//! duration) are extracted, and a generative model turns fields and clauses
//! into an Approved / Rejected decision with a justification.
//!
//! ```no_run
//! use policy_rag::{Pipeline, PolicyRagConfig};
//!
//! # async fn run() -> policy_rag::Result<()> {
//! let pipeline = Pipeline::from_config(PolicyRagConfig::from_env()?)?;
//! let doc = pipeline.ingest_file("policy.pdf".as_ref()).await?;
//! let answer = pipeline.answer(&doc, "46M, knee surgery in Pune, 3-month policy").await?;
//! println!("{:?}: {}", answer.decision.verdict, answer.decision.justification);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod embeddings;
pub mod error;
pub mod fields;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use config::PolicyRagConfig;
pub use error::{Error, Result};
pub use pipeline::Pipeline;
pub use types::{
    Answer, Chunk, Decision, DocumentType, Gender, IndexedDocument, MatchedClause, NormalizedText,
    ParsedFields, ScoredChunk, Verdict,
};
