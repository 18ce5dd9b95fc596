//! Similarity ranking of chunks against a query

pub mod ranker;

pub use ranker::{cosine_similarity, rank};
