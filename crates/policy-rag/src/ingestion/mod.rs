//! Document ingestion: extraction, normalization, segmentation and chunking

pub mod chunker;
mod normalize;
pub mod parser;
pub mod segmenter;

pub use chunker::{chunk, TextChunker};
pub use normalize::{normalize_lines, normalize_unit};
pub use parser::TextExtractor;
pub use segmenter::{SegmenterResources, SentenceSegmenter};
