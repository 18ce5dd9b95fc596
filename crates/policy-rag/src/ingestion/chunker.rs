//! Sentence-aligned chunking under a word budget

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::Chunk;

use super::segmenter::SentenceSegmenter;

/// Greedy sentence packer
///
/// Sentences are added to the open chunk while the combined word count stays
/// within `max_words`. The open chunk carries across paragraph lines, so a
/// chunk may span paragraphs. A sentence longer than the budget becomes a
/// chunk on its own.
#[derive(Debug, Clone)]
pub struct TextChunker {
    segmenter: SentenceSegmenter,
    max_words: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(segmenter: SentenceSegmenter, max_words: usize) -> Self {
        Self {
            segmenter,
            max_words: max_words.max(1),
        }
    }

    /// Create from config; fails if the segmenter's language data is missing
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Ok(Self::new(
            SentenceSegmenter::from_config(config)?,
            config.max_words,
        ))
    }

    /// Word budget per chunk
    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Chunk with the configured budget
    pub fn chunk_text(&self, text: &str) -> Vec<Chunk> {
        self.chunk(text, self.max_words)
    }

    /// Chunk newline-delimited text with an explicit budget
    pub fn chunk(&self, text: &str, max_words: usize) -> Vec<Chunk> {
        let max_words = max_words.max(1);
        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_words = 0usize;

        let sentences = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .flat_map(|line| self.segmenter.sentences(line));

        for sentence in sentences {
            let words = sentence.split_whitespace().count();
            if words == 0 {
                continue;
            }

            if current_words + words > max_words && !current.is_empty() {
                chunks.push(Chunk::new(chunks.len(), current.join(" ")));
                current.clear();
                current_words = 0;
            }

            current.push(sentence);
            current_words += words;
        }

        if !current.is_empty() {
            chunks.push(Chunk::new(chunks.len(), current.join(" ")));
        }

        tracing::debug!(
            "Chunked {} words into {} chunks (max {} words)",
            chunks.iter().map(|c| c.word_count).sum::<usize>(),
            chunks.len(),
            max_words
        );

        chunks
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(
            SentenceSegmenter::english(),
            ChunkingConfig::default().max_words,
        )
    }
}

/// Chunk with the built-in English segmenter
pub fn chunk(text: &str, max_words: usize) -> Vec<Chunk> {
    TextChunker::default().chunk(text, max_words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences_of(chunks: &[Chunk]) -> Vec<String> {
        let seg = SentenceSegmenter::english();
        chunks.iter().flat_map(|c| seg.sentences(&c.text)).collect()
    }

    #[test]
    fn test_packs_under_budget() {
        let text = "One two three. Four five. Six seven eight nine.\nTen eleven.";
        let chunks = chunk(text, 5);

        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["One two three. Four five.", "Six seven eight nine.", "Ten eleven."]
        );
        assert!(chunks.iter().all(|c| c.word_count <= 5));
    }

    #[test]
    fn test_carries_across_paragraphs() {
        let chunks = chunk("Alpha beta.\n\nGamma delta.\nEpsilon.", 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Alpha beta. Gamma delta. Epsilon.");
        assert_eq!(chunks[0].word_count, 5);
    }

    #[test]
    fn test_oversized_sentence_is_own_chunk() {
        let text = "Short one. This sentence has far more words than the budget allows. End.";
        let chunks = chunk(text, 4);
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Short one.",
                "This sentence has far more words than the budget allows.",
                "End."
            ]
        );
        assert!(chunks[1].word_count > 4);
    }

    #[test]
    fn test_budget_and_order_hold() {
        let text = "The insured must notify the insurer within 30 days. \
            Pre-existing conditions are excluded for 48 months.\n\
            Dr. Rao confirmed the diagnosis. The sum insured is Rs. 5 lakh.\n\
            Cashless treatment is available at network hospitals only. \
            Room rent is capped at 1% of the sum insured per day.";
        let seg = SentenceSegmenter::english();
        let expected: Vec<String> = text.lines().flat_map(|l| seg.sentences(l)).collect();

        for max_words in [1, 3, 8, 12, 20, 1000] {
            let chunks = chunk(text, max_words);
            for c in &chunks {
                let sentences = seg.sentences(&c.text);
                assert!(
                    c.word_count <= max_words || sentences.len() == 1,
                    "chunk over budget with several sentences: {:?}",
                    c.text
                );
            }
            assert_eq!(sentences_of(&chunks), expected);
            assert!(chunks.iter().enumerate().all(|(i, c)| c.index == i));
        }
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert!(chunk("", 300).is_empty());
        assert!(chunk("\n   \n\t\n", 300).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let text = "A b c. D e f g. H i.\nJ k l m n o.";
        assert_eq!(chunk(text, 4), chunk(text, 4));
    }
}
