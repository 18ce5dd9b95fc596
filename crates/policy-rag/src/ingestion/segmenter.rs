//! Language-aware sentence segmentation
//!
//! Unicode sentence boundaries (UAX #29) already keep decimal numbers such as
//! `2.5` intact. What they cannot know is that `Dr.` or `Rs.` does not end a
//! sentence, so boundaries that fall right after a known abbreviation (or a
//! single-letter initial) are re-joined using the language's abbreviation set.

use std::collections::HashSet;
use std::path::Path;

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};

const ENGLISH_ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "sr.", "jr.", "st.", "mt.", "vs.", "etc.", "e.g.",
    "i.e.", "viz.", "cf.", "al.", "approx.", "incl.", "excl.", "dept.", "govt.", "ltd.",
    "corp.", "inc.", "rs.", "inr.", "usd.", "jan.", "feb.", "apr.", "jun.", "jul.", "aug.",
    "sep.", "sept.", "oct.", "nov.", "dec.",
];

/// Also ordinary words, so they only join when a number follows ("No. 5", "Sec. 3")
const ENGLISH_NUMERIC_ABBREVIATIONS: &[&str] = &[
    "no.", "nos.", "sec.", "cl.", "art.", "para.", "pp.", "vol.", "fig.", "co.", "max.", "min.",
    "yr.", "yrs.", "hr.", "hrs.", "mo.", "mar.",
];

fn to_set(entries: &[&str]) -> HashSet<String> {
    entries.iter().map(|a| a.to_string()).collect()
}

/// Language data required for segmentation
#[derive(Debug, Clone)]
pub struct SegmenterResources {
    language: String,
    abbreviations: HashSet<String>,
    numeric_abbreviations: HashSet<String>,
}

impl SegmenterResources {
    /// Built-in profile for a language code
    ///
    /// Only English ships with the crate; any other language needs its own
    /// resources and fails here instead of silently splitting with the wrong rules.
    pub fn builtin(language: &str) -> Result<Self> {
        match language.trim().to_lowercase().as_str() {
            "en" | "eng" | "english" => Ok(Self::english()),
            other => Err(Error::SegmentationResourceMissing(format!(
                "no sentence data for language '{}'",
                other
            ))),
        }
    }

    fn english() -> Self {
        Self {
            language: "en".to_string(),
            abbreviations: to_set(ENGLISH_ABBREVIATIONS),
            numeric_abbreviations: to_set(ENGLISH_NUMERIC_ABBREVIATIONS),
        }
    }

    /// Merge abbreviations from a file, one per line (`#` starts a comment)
    pub fn with_abbreviation_file(mut self, path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::SegmentationResourceMissing(format!(
                "abbreviation list {}: {}",
                path.display(),
                e
            ))
        })?;

        for line in raw.lines() {
            let entry = line.split('#').next().unwrap_or("").trim().to_lowercase();
            if entry.is_empty() {
                continue;
            }
            let entry = if entry.ends_with('.') {
                entry
            } else {
                format!("{}.", entry)
            };
            self.abbreviations.insert(entry);
        }
        Ok(self)
    }

    /// Load resources described by the chunking config
    pub fn load(config: &ChunkingConfig) -> Result<Self> {
        let resources = Self::builtin(&config.language)?;
        match &config.abbreviations_path {
            Some(path) => resources.with_abbreviation_file(path),
            None => Ok(resources),
        }
    }

    /// Language code
    pub fn language(&self) -> &str {
        &self.language
    }

    fn is_abbreviation(&self, token: &str) -> bool {
        self.abbreviations.contains(&token.to_lowercase())
    }

    fn is_numeric_abbreviation(&self, token: &str) -> bool {
        self.numeric_abbreviations.contains(&token.to_lowercase())
    }
}

/// Splits paragraph text into sentences
#[derive(Debug, Clone)]
pub struct SentenceSegmenter {
    resources: SegmenterResources,
}

impl SentenceSegmenter {
    /// Create a segmenter from loaded resources
    pub fn new(resources: SegmenterResources) -> Self {
        Self { resources }
    }

    /// Create from config, failing if the language data is unavailable
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        let resources = SegmenterResources::load(config)?;
        tracing::debug!(
            "Sentence segmenter ready (language: {}, {} abbreviations)",
            resources.language,
            resources.abbreviations.len()
        );
        Ok(Self::new(resources))
    }

    /// Segmenter with the built-in English profile
    pub fn english() -> Self {
        Self::new(SegmenterResources::english())
    }

    /// Language code of the loaded profile
    pub fn language(&self) -> &str {
        self.resources.language()
    }

    /// Split text into trimmed, non-empty sentences
    pub fn sentences(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut pending = String::new();

        let mut pieces = text.split_sentence_bounds().peekable();
        while let Some(piece) = pieces.next() {
            pending.push_str(piece);
            if pending.trim().is_empty() {
                pending.clear();
                continue;
            }
            if self.ends_mid_sentence(piece, pieces.peek().copied()) {
                continue;
            }
            sentences.push(pending.trim().to_string());
            pending.clear();
        }

        if !pending.trim().is_empty() {
            sentences.push(pending.trim().to_string());
        }

        sentences
    }

    /// True when the boundary between `piece` and `next` is a false one
    fn ends_mid_sentence(&self, piece: &str, next: Option<&str>) -> bool {
        let last = piece.trim_end().rsplit(char::is_whitespace).next().unwrap_or("");
        let token = last.trim_start_matches(|c: char| matches!(c, '(' | '[' | '"' | '\'' | '“' | '‘'));

        if !token.ends_with('.') {
            return false;
        }
        if self.resources.is_abbreviation(token) {
            return true;
        }
        if self.resources.is_numeric_abbreviation(token) {
            return next
                .and_then(|n| n.trim_start().chars().next())
                .is_some_and(|c| c.is_ascii_digit());
        }

        // Single uppercase initial such as "J." in "J. Smith"
        let mut chars = token.chars();
        matches!(
            (chars.next(), chars.next(), chars.next()),
            (Some(c), Some('.'), None) if c.is_uppercase()
        )
    }
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self::english()
    }
}
