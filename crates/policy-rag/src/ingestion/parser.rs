//! Bounded text extraction for uploaded documents

use pulldown_cmark::{Event, Parser as MarkdownParser, Tag, TagEnd};

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::types::{DocumentType, NormalizedText, RawDocument};

use super::normalize::{normalize_lines, normalize_unit};

/// Block-level HTML elements treated as paragraph units
const HTML_BLOCKS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "td", "th", "pre", "blockquote",
];

/// Converts a raw document into bounded, normalized text
///
/// `max_pages` bounds page-oriented formats and `max_paragraphs` bounds
/// paragraph-oriented ones. Reading stops as soon as the bound is hit.
#[derive(Debug, Clone, Copy)]
pub struct TextExtractor {
    max_pages: usize,
    max_paragraphs: usize,
}

impl TextExtractor {
    /// Create a new extractor
    pub fn new(max_pages: usize, max_paragraphs: usize) -> Self {
        Self {
            max_pages,
            max_paragraphs,
        }
    }

    /// Create from config
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.max_pages, config.max_paragraphs)
    }

    /// Extract a raw document
    pub fn extract_raw(&self, raw: &RawDocument<'_>) -> Result<NormalizedText> {
        self.extract(raw.data, raw.doc_type)
    }

    /// Extract text from bytes of a declared type
    pub fn extract(&self, data: &[u8], doc_type: DocumentType) -> Result<NormalizedText> {
        let units = match doc_type {
            DocumentType::Pdf => self.extract_pdf(data)?,
            DocumentType::Docx => self.extract_docx(data)?,
            DocumentType::Text => self.extract_text(data)?,
            DocumentType::Markdown => self.extract_markdown(data)?,
            DocumentType::Html => self.extract_html(data)?,
        };

        let text = NormalizedText::from_units(units);
        if text.is_empty() {
            tracing::warn!("No text found in {} document", doc_type);
        } else {
            tracing::debug!(
                "Extracted {} paragraphs ({} words) from {} document",
                text.paragraphs().count(),
                text.word_count(),
                doc_type
            );
        }
        Ok(text)
    }

    /// Page-by-page PDF extraction, stopping after `max_pages`
    fn extract_pdf(&self, data: &[u8]) -> Result<Vec<String>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::extraction("pdf", format!("Failed to load PDF: {}", e)))?;

        let mut units = Vec::new();

        // get_pages is ordered by page number
        for (page_num, page_id) in doc.get_pages().into_iter().take(self.max_pages) {
            let page_text = match doc.extract_text(&[page_num]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("extract_text failed on page {}: {}, scanning content stream", page_num, e);
                    match doc.get_page_content(page_id) {
                        Ok(content) => text_from_content_stream(&content),
                        Err(e) => {
                            tracing::warn!("Skipping unreadable PDF page {}: {}", page_num, e);
                            continue;
                        }
                    }
                }
            };

            // Pages without text are skipped, they are not an error
            units.extend(normalize_lines(&page_text));
        }

        Ok(units)
    }

    /// DOCX body paragraphs, stopping after `max_paragraphs`
    ///
    /// Every body paragraph counts toward the bound, empty ones included.
    fn extract_docx(&self, data: &[u8]) -> Result<Vec<String>> {
        let doc = docx_rs::read_docx(data)
            .map_err(|e| Error::extraction("docx", e.to_string()))?;

        let mut units = Vec::new();
        let mut seen = 0usize;

        for child in doc.document.children {
            if seen >= self.max_paragraphs {
                break;
            }
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                seen += 1;
                let mut text = String::new();
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            match child {
                                docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                                docx_rs::RunChild::Tab(_) => text.push(' '),
                                _ => {}
                            }
                        }
                    }
                }
                let text = normalize_unit(&text);
                if !text.is_empty() {
                    units.push(text);
                }
            }
        }

        Ok(units)
    }

    /// Plain text: each non-blank line is a paragraph
    fn extract_text(&self, data: &[u8]) -> Result<Vec<String>> {
        let content = decode_utf8(data, "text")?;
        Ok(normalize_lines(content)
            .into_iter()
            .take(self.max_paragraphs)
            .collect())
    }

    /// Markdown: paragraphs, headings, list items and code blocks are units
    fn extract_markdown(&self, data: &[u8]) -> Result<Vec<String>> {
        let content = decode_utf8(data, "markdown")?;
        let mut units = Vec::new();
        let mut current = String::new();

        let flush = |current: &mut String, units: &mut Vec<String>| {
            let unit = normalize_unit(current);
            current.clear();
            if !unit.is_empty() {
                units.push(unit);
            }
        };

        for event in MarkdownParser::new(content) {
            if units.len() >= self.max_paragraphs {
                break;
            }
            match event {
                Event::Start(Tag::Paragraph | Tag::Heading { .. } | Tag::Item | Tag::CodeBlock(_)) => {
                    flush(&mut current, &mut units);
                }
                Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock) => {
                    flush(&mut current, &mut units);
                }
                Event::Text(text) | Event::Code(text) => {
                    current.push_str(&text);
                }
                Event::SoftBreak | Event::HardBreak => current.push(' '),
                _ => {}
            }
        }
        flush(&mut current, &mut units);
        units.truncate(self.max_paragraphs);

        Ok(units)
    }

    /// HTML: outermost block elements are units; bare text falls back to body lines
    fn extract_html(&self, data: &[u8]) -> Result<Vec<String>> {
        let html = decode_utf8(data, "html")?;
        let document = scraper::Html::parse_document(html);
        let selector = scraper::Selector::parse(&HTML_BLOCKS.join(", "))
            .map_err(|e| Error::internal(format!("Invalid HTML selector: {}", e)))?;

        let mut units = Vec::new();
        for element in document.select(&selector) {
            if units.len() >= self.max_paragraphs {
                break;
            }
            let nested = element
                .ancestors()
                .filter_map(scraper::ElementRef::wrap)
                .any(|a| HTML_BLOCKS.contains(&a.value().name()));
            if nested {
                continue;
            }
            let unit = normalize_unit(&element.text().collect::<Vec<_>>().join(" "));
            if !unit.is_empty() {
                units.push(unit);
            }
        }

        if units.is_empty() {
            let body = scraper::Selector::parse("body")
                .map_err(|e| Error::internal(format!("Invalid HTML selector: {}", e)))?;
            if let Some(body) = document.select(&body).next() {
                let text = body.text().collect::<Vec<_>>().join("\n");
                units = normalize_lines(&text)
                    .into_iter()
                    .take(self.max_paragraphs)
                    .collect();
            }
        }

        Ok(units)
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

fn decode_utf8<'a>(data: &'a [u8], format: &str) -> Result<&'a str> {
    std::str::from_utf8(data)
        .map_err(|e| Error::extraction(format, format!("Invalid UTF-8: {}", e)))
}

/// Pull literal strings out of `Tj`/`TJ` operators between `BT` and `ET`
///
/// Last resort for pages where lopdf's font-aware extraction fails.
fn text_from_content_stream(content: &[u8]) -> String {
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current_text = String::new();

    for line in content_str.lines() {
        let line = line.trim();

        if line == "BT" {
            in_text_block = true;
            continue;
        }

        if line == "ET" {
            in_text_block = false;
            if !current_text.is_empty() {
                text.push_str(&current_text);
                text.push('\n');
                current_text.clear();
            }
            continue;
        }

        if in_text_block && (line.ends_with("Tj") || line.ends_with("TJ")) {
            if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
                if start < end {
                    let decoded = line[start + 1..end]
                        .replace("\\(", "(")
                        .replace("\\)", ")")
                        .replace("\\\\", "\\");
                    current_text.push_str(&decoded);
                }
            }
        }
    }

    text
}
