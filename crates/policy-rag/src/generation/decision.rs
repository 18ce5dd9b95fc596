//! Claim decisions from parsed fields and retrieved clauses

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::GenerativeBackend;
use crate::types::{Decision, MatchedClause, ParsedFields, ScoredChunk, Verdict};

use super::json::first_object;
use super::prompt::{PromptBuilder, DECISION_SYSTEM};

/// Turns fields and clauses into a verdict, never failing
///
/// Clauses in the result are always the retrieved ones, in retrieval order;
/// whatever the model echoes back under `matched_clauses` is ignored.
pub struct DecisionSynthesizer {
    backend: Arc<dyn GenerativeBackend>,
    timeout: Duration,
}

impl DecisionSynthesizer {
    /// Create a synthesizer with a per-call timeout
    pub fn new(backend: Arc<dyn GenerativeBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Decide on a claim
    pub async fn decide(
        &self,
        fields: &ParsedFields,
        scored_chunks: &[ScoredChunk],
        source_label: &str,
    ) -> Decision {
        let clauses: Vec<MatchedClause> = scored_chunks
            .iter()
            .map(|scored| MatchedClause {
                source: source_label.to_string(),
                ..MatchedClause::from(scored)
            })
            .collect();

        match self.request_verdict(fields, &clauses).await {
            Ok((verdict, justification)) => {
                tracing::info!("Decision: {:?} ({} clauses)", verdict, clauses.len());
                Decision::new(verdict, justification, clauses)
            }
            Err(e) => {
                tracing::warn!("Decision generation failed, returning degraded decision: {}", e);
                Decision::degraded(e, clauses)
            }
        }
    }

    async fn request_verdict(
        &self,
        fields: &ParsedFields,
        clauses: &[MatchedClause],
    ) -> Result<(Verdict, String)> {
        let prompt = PromptBuilder::build_decision_prompt(fields, clauses);
        let raw = self
            .backend
            .complete(DECISION_SYSTEM, &prompt, self.timeout)
            .await?;
        parse_verdict(&raw)
    }
}

/// Extract verdict and justification from model output
fn parse_verdict(raw: &str) -> Result<(Verdict, String)> {
    let object = first_object(raw).ok_or_else(|| Error::llm("response contained no JSON object"))?;

    let verdict = object
        .get("decision")
        .and_then(|v| v.as_str())
        .and_then(Verdict::parse)
        .ok_or_else(|| Error::llm("response has no usable \"decision\" value"))?;

    let justification = object
        .get("justification")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("No justification provided.")
        .to_string();

    Ok((verdict, justification))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockGenerative;
    use crate::types::Chunk;

    fn scored(index: usize, text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk::new(index, text.to_string()),
            score,
            source: "chunk-source".to_string(),
        }
    }

    fn synthesizer(replies: Vec<Result<String>>) -> (Arc<MockGenerative>, DecisionSynthesizer) {
        let mock = Arc::new(MockGenerative::replying(replies));
        let synth = DecisionSynthesizer::new(mock.clone(), Duration::from_secs(5));
        (mock, synth)
    }

    #[tokio::test]
    async fn test_parses_verdict_and_discards_echoed_clauses() {
        let reply = r#"Here you go: {"decision": "approved", "justification": "Knee surgery is covered.",
            "matched_clauses": [{"text": "invented", "similarity": 99.9, "source": "elsewhere"}]}"#;
        let (mock, synth) = synthesizer(vec![Ok(reply.to_string())]);
        let chunks = vec![scored(4, " Knee surgery is covered. ", 0.8312), scored(1, "Exclusions.", 0.5)];

        let decision = synth.decide(&ParsedFields::default(), &chunks, "policy.pdf").await;

        assert_eq!(decision.verdict, Verdict::Approved);
        assert_eq!(decision.justification, "Knee surgery is covered.");
        assert_eq!(decision.matched_clauses.len(), 2);
        assert_eq!(decision.matched_clauses[0].text, "Knee surgery is covered.");
        assert_eq!(decision.matched_clauses[0].similarity_percentage, 83.12);
        assert_eq!(decision.matched_clauses[0].source, "policy.pdf");
        assert_eq!(decision.matched_clauses[1].text, "Exclusions.");

        assert_eq!(mock.calls(), 1);
        let prompt = mock.last_user.lock().clone().unwrap();
        assert!(prompt.contains("Clause from policy.pdf (Match: 83.12%):\nKnee surgery is covered."));
    }

    #[tokio::test]
    async fn test_timeout_degrades_with_input_clauses() {
        let (_, synth) = synthesizer(vec![Err(Error::GenerationTimeout(Duration::from_secs(5)))]);
        let chunks = vec![scored(0, "Room rent capped.", 0.4), scored(2, "Co-pay 10%.", 0.3)];

        let decision = synth.decide(&ParsedFields::default(), &chunks, "policy.pdf").await;

        assert_eq!(decision.verdict, Verdict::Rejected);
        assert!(decision.is_degraded());
        assert!(decision.justification.contains("timed out"));
        let texts: Vec<_> = decision.matched_clauses.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Room rent capped.", "Co-pay 10%."]);
    }

    #[tokio::test]
    async fn test_unparseable_output_degrades() {
        for reply in ["I think it should be approved.", r#"{"decision": "maybe"}"#, "{broken"] {
            let (_, synth) = synthesizer(vec![Ok(reply.to_string())]);
            let decision = synth
                .decide(&ParsedFields::default(), &[scored(0, "Clause.", 0.9)], "p")
                .await;
            assert_eq!(decision.verdict, Verdict::Rejected, "reply: {}", reply);
            assert!(decision.is_degraded());
            assert_eq!(decision.matched_clauses.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_model_wording_does_not_mark_degraded() {
        let reply = r#"{"decision": "Rejected", "justification": "Automated decision unavailable phrasing from the model."}"#;
        let (_, synth) = synthesizer(vec![Ok(reply.to_string())]);
        let decision = synth
            .decide(&ParsedFields::default(), &[scored(0, "Clause.", 0.9)], "p")
            .await;
        assert_eq!(decision.verdict, Verdict::Rejected);
        assert!(!decision.is_degraded());
    }

    #[tokio::test]
    async fn test_no_clauses_still_decides() {
        let (_, synth) = synthesizer(vec![Ok(r#"{"decision":"Rejected","justification":"No clause covers this."}"#.to_string())]);
        let decision = synth.decide(&ParsedFields::default(), &[], "p").await;
        assert_eq!(decision.verdict, Verdict::Rejected);
        assert!(!decision.is_degraded());
        assert!(decision.matched_clauses.is_empty());
    }

    #[test]
    fn test_missing_justification_filled() {
        let (verdict, justification) = parse_verdict(r#"{"decision": "Approved"}"#).unwrap();
        assert_eq!(verdict, Verdict::Approved);
        assert!(!justification.is_empty());
    }
}
