//! Retrieval results and claim decisions

use serde::{Deserialize, Serialize};

use super::document::Chunk;
use super::fields::ParsedFields;

/// A chunk scored against a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
    /// Source label (document name)
    pub source: String,
}

impl ScoredChunk {
    /// Similarity as a percentage rounded to two decimals
    pub fn similarity_percentage(&self) -> f64 {
        (f64::from(self.score) * 100.0 * 100.0).round() / 100.0
    }
}

/// Final verdict on a claim
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Verdict {
    /// Claim is covered
    Approved,
    /// Claim is not covered, or no decision could be made
    Rejected,
}

impl Verdict {
    /// Case-insensitive parse of model output
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "approved" | "approve" => Some(Self::Approved),
            "rejected" | "reject" | "denied" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// A retrieved clause cited in a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedClause {
    /// Clause text
    pub text: String,
    /// Similarity percentage (two decimals)
    pub similarity_percentage: f64,
    /// Source label
    pub source: String,
}

impl From<&ScoredChunk> for MatchedClause {
    fn from(scored: &ScoredChunk) -> Self {
        Self {
            text: scored.chunk.text.trim().to_string(),
            similarity_percentage: scored.similarity_percentage(),
            source: scored.source.clone(),
        }
    }
}

/// Structured verdict, always fully populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Approved or rejected
    #[serde(rename = "decision")]
    pub verdict: Verdict,
    /// Explanation of the verdict
    pub justification: String,
    /// Clauses the verdict was based on, in retrieval order
    pub matched_clauses: Vec<MatchedClause>,
    #[serde(skip)]
    degraded: bool,
}

impl Decision {
    /// Verdict produced by the generative backend
    pub fn new(
        verdict: Verdict,
        justification: impl Into<String>,
        matched_clauses: Vec<MatchedClause>,
    ) -> Self {
        Self {
            verdict,
            justification: justification.into(),
            matched_clauses,
            degraded: false,
        }
    }

    /// Deterministic fallback used when no verdict could be produced
    pub fn degraded(reason: impl std::fmt::Display, matched_clauses: Vec<MatchedClause>) -> Self {
        Self {
            verdict: Verdict::Rejected,
            justification: format!("Automated decision unavailable: {}", reason),
            matched_clauses,
            degraded: true,
        }
    }

    /// True when this decision is a degraded fallback
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

/// One answered question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// The question as asked
    pub question: String,
    /// Fields extracted from the question
    pub parsed_fields: ParsedFields,
    /// The decision
    pub decision: Decision,
}
