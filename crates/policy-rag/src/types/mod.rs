//! Core types for the policy Q&A pipeline

pub mod decision;
pub mod document;
pub mod fields;

pub use decision::{Answer, Decision, MatchedClause, ScoredChunk, Verdict};
pub use document::{Chunk, DocumentType, IndexedDocument, NormalizedText, RawDocument};
pub use fields::{Gender, ParsedFields};
