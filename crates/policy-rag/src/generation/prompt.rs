//! Prompt templates for field extraction and claim decisions

use crate::types::{MatchedClause, ParsedFields};

/// System prompt for structured field extraction
pub const EXTRACTION_SYSTEM: &str =
    "You are a helpful assistant that extracts structured data from insurance-related questions.";

/// System prompt for claim decisions
pub const DECISION_SYSTEM: &str = "You are an expert insurance claims decision engine. \
Read the user input and policy clauses to make an informed decision.";

/// Prompt builder for the two generative calls
pub struct PromptBuilder;

impl PromptBuilder {
    /// Ask for the five claim fields as JSON
    pub fn build_extraction_prompt(query: &str) -> String {
        format!(
            r#"Extract the following fields from this insurance query:
- age (number)
- gender ("male", "female" or null)
- procedure
- location
- policy_duration

Use null for anything the query does not state.
Only return valid JSON.
Query:
"""{query}""""#,
            query = query.trim()
        )
    }

    /// Format retrieved clauses with match percentage and source
    pub fn build_clause_block(clauses: &[MatchedClause]) -> String {
        if clauses.is_empty() {
            return "(no matching clauses were found in the document)".to_string();
        }

        clauses
            .iter()
            .map(|c| {
                format!(
                    "Clause from {} (Match: {}%):\n{}",
                    c.source, c.similarity_percentage, c.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Ask for a verdict on the parsed fields against the clauses
    pub fn build_decision_prompt(fields: &ParsedFields, clauses: &[MatchedClause]) -> String {
        let fields_json = serde_json::to_string_pretty(fields).unwrap_or_else(|_| "{}".to_string());

        format!(
            r#"User Information:
{fields}

Policy Clauses (with match % and sources):
{clauses}

Instructions:
Analyze the input and determine whether the claim should be approved or rejected.
Base the decision only on the clauses above and explain it.
Return only valid JSON in the format:
{{
  "decision": "Approved" or "Rejected",
  "justification": "..."
}}"#,
            fields = fields_json,
            clauses = Self::build_clause_block(clauses)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Gender;

    fn clause(text: &str, pct: f64) -> MatchedClause {
        MatchedClause {
            text: text.to_string(),
            similarity_percentage: pct,
            source: "policy.pdf".to_string(),
        }
    }

    #[test]
    fn test_extraction_prompt_quotes_query() {
        let prompt = PromptBuilder::build_extraction_prompt("  46M, knee surgery, Pune  ");
        assert!(prompt.contains("\"\"\"46M, knee surgery, Pune\"\"\""));
        assert!(prompt.contains("policy_duration"));
    }

    #[test]
    fn test_clause_block_format() {
        let block = PromptBuilder::build_clause_block(&[
            clause("Knee surgery is covered.", 83.45),
            clause("Waiting period is 24 months.", 12.0),
        ]);
        assert_eq!(
            block,
            "Clause from policy.pdf (Match: 83.45%):\nKnee surgery is covered.\n\n\
             Clause from policy.pdf (Match: 12%):\nWaiting period is 24 months."
        );
    }

    #[test]
    fn test_decision_prompt_includes_fields_and_clauses() {
        let fields = ParsedFields {
            age: Some(46),
            gender: Gender::Male,
            procedure: Some("knee surgery".to_string()),
            ..ParsedFields::default()
        };
        let prompt = PromptBuilder::build_decision_prompt(&fields, &[clause("Covered.", 90.0)]);
        assert!(prompt.contains("\"age\": 46"));
        assert!(prompt.contains("\"gender\": \"male\""));
        assert!(prompt.contains("\"location\": null"));
        assert!(prompt.contains("(Match: 90%)"));
        assert!(prompt.contains("\"decision\": \"Approved\" or \"Rejected\""));
    }

    #[test]
    fn test_empty_clause_block() {
        assert!(PromptBuilder::build_clause_block(&[]).contains("no matching clauses"));
    }
}
