//! Locating JSON objects inside free-form model output
//!
//! Models wrap JSON in commentary, code fences, or emit several objects.
//! Candidates are balanced `{ ... }` spans, found while respecting string
//! literals and escapes; the first span that parses as an object wins.

use serde_json::{Map, Value};

/// Iterate over every well-formed JSON object in `text`, in order of appearance
///
/// Nested objects are not reported separately from their parent. A malformed
/// span is skipped and scanning resumes after its opening brace.
pub fn objects(text: &str) -> impl Iterator<Item = Map<String, Value>> + '_ {
    let mut cursor = 0usize;
    std::iter::from_fn(move || {
        while let Some(offset) = text[cursor..].find('{') {
            let start = cursor + offset;
            match balanced_end(text, start) {
                Some(end) => {
                    if let Ok(Value::Object(map)) = serde_json::from_str(&text[start..end]) {
                        cursor = end;
                        return Some(map);
                    }
                    cursor = start + 1;
                }
                None => cursor = start + 1,
            }
        }
        cursor = text.len();
        None
    })
}

/// First well-formed JSON object in `text`
pub fn first_object(text: &str) -> Option<Map<String, Value>> {
    objects(text).next()
}

/// Byte index just past the brace that closes the one at `start`
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_commentary() {
        let raw = "Sure! Here is the JSON you asked for:\n```json\n{\"age\": 46, \"gender\": \"male\"}\n```\nLet me know.";
        let obj = first_object(raw).unwrap();
        assert_eq!(obj["age"], 46);
        assert_eq!(obj["gender"], "male");
    }

    #[test]
    fn test_braces_inside_strings() {
        let raw = r#"{"justification": "Clause {3} applies \"as written\" }", "decision": "Approved"}"#;
        let obj = first_object(raw).unwrap();
        assert_eq!(obj["decision"], "Approved");
        assert_eq!(obj["justification"], "Clause {3} applies \"as written\" }");
    }

    #[test]
    fn test_malformed_span_then_valid() {
        let raw = "{not json} and then {\"decision\": \"Rejected\"}";
        let obj = first_object(raw).unwrap();
        assert_eq!(obj["decision"], "Rejected");
    }

    #[test]
    fn test_unbalanced_prefix() {
        let raw = "{ \"a\": 1, oops {\"b\": 2}";
        let obj = first_object(raw).unwrap();
        assert_eq!(obj["b"], 2);
    }

    #[test]
    fn test_nested_object_reported_once() {
        let raw = r#"{"outer": {"inner": 1}} {"second": true}"#;
        let all: Vec<_> = objects(raw).collect();
        assert_eq!(all.len(), 2);
        assert!(all[0].contains_key("outer"));
        assert_eq!(all[1]["second"], true);
    }

    #[test]
    fn test_no_object() {
        assert!(first_object("").is_none());
        assert!(first_object("no braces here").is_none());
        assert!(first_object("[1, 2, 3]").is_none());
        assert!(first_object("{\"open\": ").is_none());
    }
}
