//! Document, chunk and indexed-document types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Document formats the extractor can read
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// PDF document (page-oriented)
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text file
    Text,
    /// Markdown file
    Markdown,
    /// HTML document
    Html,
}

impl DocumentType {
    /// Detect document type from extension
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" | "text" => Ok(Self::Text),
            "md" | "markdown" => Ok(Self::Markdown),
            "html" | "htm" => Ok(Self::Html),
            other => Err(Error::UnsupportedFormat(format!(".{}", other))),
        }
    }

    /// Detect document type from a MIME type such as `application/pdf`
    pub fn from_mime(mime: &str) -> Result<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "application/pdf" => Ok(Self::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Ok(Self::Docx)
            }
            "text/plain" => Ok(Self::Text),
            "text/markdown" | "text/x-markdown" => Ok(Self::Markdown),
            "text/html" | "application/xhtml+xml" => Ok(Self::Html),
            _ => Err(Error::UnsupportedFormat(essence)),
        }
    }

    /// Detect document type from a filename
    ///
    /// Tries the extension first, then whatever MIME type `mime_guess` associates with it.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or("");

        Self::from_extension(extension).or_else(|err| {
            mime_guess::from_path(filename)
                .iter()
                .find_map(|mime| Self::from_mime(mime.essence_str()).ok())
                .ok_or(err)
        })
    }

    /// Guess the type from magic bytes
    ///
    /// Only formats with a reliable signature are recognised. A ZIP container is
    /// assumed to be DOCX when it carries a `word/` part.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"%PDF-") {
            return Some(Self::Pdf);
        }
        if data.starts_with(b"PK\x03\x04") {
            let window = &data[..data.len().min(64 * 1024)];
            if window.windows(5).any(|w| w == b"word/") {
                return Some(Self::Docx);
            }
            return None;
        }
        let head = String::from_utf8_lossy(&data[..data.len().min(512)]).to_lowercase();
        let head = head.trim_start();
        if head.starts_with("<!doctype html") || head.starts_with("<html") {
            return Some(Self::Html);
        }
        None
    }

    /// Resolve the declared type of an upload
    ///
    /// Order: explicit MIME type, filename, content sniffing.
    pub fn resolve(filename: Option<&str>, mime: Option<&str>, data: &[u8]) -> Result<Self> {
        if let Some(found) = mime.and_then(|m| Self::from_mime(m).ok()) {
            return Ok(found);
        }
        let by_name = filename.map(Self::from_filename);
        match by_name {
            Some(Ok(found)) => Ok(found),
            Some(Err(err)) => Self::sniff(data).ok_or(err),
            None => Self::sniff(data)
                .ok_or_else(|| Error::UnsupportedFormat("undeclared document type".to_string())),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Html => "html",
        };
        f.write_str(name)
    }
}

/// Uploaded document bytes with their declared type
#[derive(Debug, Clone)]
pub struct RawDocument<'a> {
    /// Raw content
    pub data: &'a [u8],
    /// Declared format
    pub doc_type: DocumentType,
}

/// Extracted, whitespace-normalized document text
///
/// Paragraph units are separated by single newlines. An empty value means the
/// document contained no extractable text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    /// Build from paragraph units, dropping empty ones
    pub fn from_units<I, S>(units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = units
            .into_iter()
            .map(|u| u.as_ref().trim().to_string())
            .filter(|u| !u.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Self(joined.trim().to_string())
    }

    /// Text content
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when no text was found
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Paragraph units in document order
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.0.lines().map(str::trim).filter(|l| !l.is_empty())
    }

    /// Number of whitespace-separated words
    pub fn word_count(&self) -> usize {
        self.0.split_whitespace().count()
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A sentence-aligned slice of document text; the unit of retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in the document's chunk sequence (chunk identity)
    pub index: usize,
    /// Text content (whole sentences joined by single spaces)
    pub text: String,
    /// Whitespace-separated word count of `text`
    pub word_count: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(index: usize, text: String) -> Self {
        let word_count = text.split_whitespace().count();
        Self {
            index,
            text,
            word_count,
        }
    }
}

/// A document that has been extracted, chunked and embedded
///
/// Owned by the session that created it. Vectors are derived data and are
/// recomputed whenever the document is ingested again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Unique document ID
    pub id: Uuid,
    /// Label used when citing clauses (usually the original filename)
    pub source_label: String,
    /// Format the text was extracted from
    pub doc_type: DocumentType,
    /// Chunks in document order
    pub chunks: Vec<Chunk>,
    /// One vector per chunk, same order
    #[serde(skip)]
    pub vectors: Vec<Vec<f32>>,
    /// Vector width
    pub dimensions: usize,
}

impl IndexedDocument {
    /// Create an indexed document
    pub fn new(
        source_label: impl Into<String>,
        doc_type: DocumentType,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        dimensions: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_label: source_label.into(),
            doc_type,
            chunks,
            vectors,
            dimensions,
        }
    }

    /// True when the document produced no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(DocumentType::from_extension("PDF").unwrap(), DocumentType::Pdf);
        assert_eq!(DocumentType::from_extension(".docx").unwrap(), DocumentType::Docx);
        assert_eq!(DocumentType::from_extension("md").unwrap(), DocumentType::Markdown);
        assert!(matches!(
            DocumentType::from_extension("xls"),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_from_mime_ignores_parameters() {
        assert_eq!(
            DocumentType::from_mime("text/html; charset=utf-8").unwrap(),
            DocumentType::Html
        );
        assert!(DocumentType::from_mime("image/png").is_err());
    }

    #[test]
    fn test_resolve_prefers_mime_then_name_then_sniff() {
        let pdf = b"%PDF-1.7\n...";
        assert_eq!(
            DocumentType::resolve(Some("policy.txt"), Some("application/pdf"), pdf).unwrap(),
            DocumentType::Pdf
        );
        assert_eq!(
            DocumentType::resolve(Some("policy.txt"), None, pdf).unwrap(),
            DocumentType::Text
        );
        assert_eq!(
            DocumentType::resolve(Some("upload.bin"), None, pdf).unwrap(),
            DocumentType::Pdf
        );
        assert!(DocumentType::resolve(None, None, b"\x00\x01garbage").is_err());
    }

    #[test]
    fn test_normalized_text_units() {
        let text = NormalizedText::from_units(["  first  ", "", "second"]);
        assert_eq!(text.as_str(), "first\nsecond");
        assert_eq!(text.paragraphs().count(), 2);
        assert!(NormalizedText::from_units(Vec::<String>::new()).is_empty());
    }
}
