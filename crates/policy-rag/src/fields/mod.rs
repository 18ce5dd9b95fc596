//! Claim field extraction with rule-based fallbacks

pub mod extractor;
pub mod gazetteer;
pub mod resolvers;

pub use extractor::FieldExtractor;
pub use gazetteer::Gazetteer;
pub use resolvers::{FieldChain, Resolver};
