//! Whitespace and glyph normalization for extracted text units

/// Characters folded to plain equivalents before whitespace collapse.
///
/// Ligatures and typographic spaces are the usual leftovers of PDF font
/// encodings; anything else is kept as-is.
const FOLDS: &[(char, &str)] = &[
    ('\u{0000}', ""),
    ('\u{00A0}', " "), // Non-breaking space
    ('\u{2002}', " "), // En space
    ('\u{2003}', " "), // Em space
    ('\u{2009}', " "), // Thin space
    ('\u{200B}', ""),  // Zero-width space
    ('\u{FEFF}', ""),  // Byte order mark
    ('\u{00AD}', ""),  // Soft hyphen
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Normalize a single paragraph unit: fold glyphs, collapse whitespace, trim.
pub fn normalize_unit(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.chars() {
        match FOLDS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => folded.push_str(to),
            None => folded.push(c),
        }
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a multi-line block (a PDF page, a text file) into normalized units.
pub fn normalize_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(normalize_unit)
        .filter(|line| !line.is_empty())
        .collect()
}
