//! Structured field extraction from a claim question
//!
//! The generative backend is asked first. Whatever it could not (or did not)
//! supply is filled per field from rule-based fallbacks. Extraction never
//! fails: a dead backend just means every field goes through its fallbacks.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::generation::json::first_object;
use crate::generation::prompt::{PromptBuilder, EXTRACTION_SYSTEM};
use crate::providers::GenerativeBackend;
use crate::types::{Gender, ParsedFields};

use super::gazetteer::Gazetteer;
use super::resolvers::{age_chain, gender_chain, plausible_age, FieldChain, Resolver};

/// Placeholder values models use for "not stated"
const UNSET: &[&str] = &[
    "", "unknown", "null", "none", "n/a", "na", "not specified", "not mentioned", "not provided",
    "not stated",
];

/// Fields as reported by the model, after lenient normalization
#[derive(Debug, Default)]
struct ModelFields {
    age: Option<u32>,
    gender: Option<Gender>,
    procedure: Option<String>,
    location: Option<String>,
    policy_duration: Option<String>,
}

/// Field extractor with per-field fallback chains
pub struct FieldExtractor {
    backend: Arc<dyn GenerativeBackend>,
    timeout: Duration,
    age: FieldChain<u32>,
    gender: FieldChain<Gender>,
    location: FieldChain<String>,
}

impl FieldExtractor {
    /// Create an extractor with the built-in gazetteer
    pub fn new(backend: Arc<dyn GenerativeBackend>, timeout: Duration) -> Self {
        Self::with_gazetteer(backend, timeout, Gazetteer::builtin())
    }

    /// Create an extractor with a custom gazetteer
    pub fn with_gazetteer(
        backend: Arc<dyn GenerativeBackend>,
        timeout: Duration,
        gazetteer: Gazetteer,
    ) -> Self {
        let location = FieldChain::new("location")
            .then(Resolver::new("gazetteer", move |query| gazetteer.locate(query)));

        Self {
            backend,
            timeout,
            age: age_chain(),
            gender: gender_chain(),
            location,
        }
    }

    /// Extract the five claim fields; never fails
    pub async fn extract_fields(&self, query: &str) -> ParsedFields {
        let model = match self.ask_model(query).await {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!("Model field extraction failed, using fallbacks only: {}", e);
                ModelFields::default()
            }
        };

        let fields = ParsedFields {
            age: self.age.resolve(model.age, query),
            gender: self.gender.resolve(model.gender, query).unwrap_or_default(),
            procedure: model.procedure,
            location: self.location.resolve(model.location, query),
            policy_duration: model.policy_duration,
        };

        tracing::debug!("Extracted {}/5 fields", fields.populated());
        fields
    }

    async fn ask_model(&self, query: &str) -> Result<ModelFields> {
        let prompt = PromptBuilder::build_extraction_prompt(query);
        let raw = self
            .backend
            .complete(EXTRACTION_SYSTEM, &prompt, self.timeout)
            .await?;
        let object = first_object(&raw).ok_or_else(|| Error::llm("response contained no JSON object"))?;
        Ok(model_fields(&object))
    }
}

/// Leniently read the model's object (keys matched case-insensitively)
fn model_fields(object: &Map<String, Value>) -> ModelFields {
    let get = |key: &str| {
        object
            .iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    };

    ModelFields {
        age: get("age").and_then(lenient_age),
        gender: get("gender").and_then(lenient_gender),
        procedure: get("procedure").and_then(lenient_text),
        location: get("location").and_then(lenient_text),
        policy_duration: get("policy_duration").and_then(lenient_text),
    }
}

/// Age from a number, or the first run of digits in a string ("46 years")
fn lenient_age(value: &Value) -> Option<u32> {
    let age = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))?,
        Value::String(s) => {
            let digits: String = s
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().ok()?
        }
        _ => return None,
    };
    u32::try_from(age).ok().and_then(plausible_age)
}

fn lenient_gender(value: &Value) -> Option<Gender> {
    let gender = Gender::parse_loose(value.as_str()?);
    gender.is_known().then_some(gender)
}

/// Non-placeholder text; numbers are kept as their string form
fn lenient_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let lowered = text.to_lowercase();
    (!UNSET.contains(&lowered.as_str())).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockGenerative;

    fn extractor(replies: Vec<Result<String>>) -> FieldExtractor {
        FieldExtractor::new(
            Arc::new(MockGenerative::replying(replies)),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_fallbacks_when_backend_fails() {
        let fields = extractor(Vec::new())
            .extract_fields("29F needs knee surgery in Pune")
            .await;

        assert_eq!(fields.age, Some(29));
        assert_eq!(fields.gender, Gender::Female);
        assert_eq!(fields.location.as_deref(), Some("Pune"));
        assert_eq!(fields.procedure, None);
        assert_eq!(fields.policy_duration, None);
    }

    #[tokio::test]
    async fn test_model_values_normalized() {
        let reply = r#"Extracted: {"Age": "46 years", "gender": "M", "procedure": "knee surgery",
            "location": "Pune", "policy_duration": "3 months"}"#;
        let fields = extractor(vec![Ok(reply.to_string())])
            .extract_fields("46M, knee surgery in Pune, 3-month policy")
            .await;

        assert_eq!(fields.age, Some(46));
        assert_eq!(fields.gender, Gender::Male);
        assert_eq!(fields.procedure.as_deref(), Some("knee surgery"));
        assert_eq!(fields.location.as_deref(), Some("Pune"));
        assert_eq!(fields.policy_duration.as_deref(), Some("3 months"));
    }

    #[tokio::test]
    async fn test_placeholders_fall_through_to_rules() {
        let reply = r#"{"age": null, "gender": "unknown", "procedure": "N/A", "location": "",
            "policy_duration": "not specified"}"#;
        let fields = extractor(vec![Ok(reply.to_string())])
            .extract_fields("a 52 year old woman in Chennai")
            .await;

        assert_eq!(fields.age, Some(52));
        assert_eq!(fields.gender, Gender::Female);
        assert_eq!(fields.procedure, None);
        assert_eq!(fields.location.as_deref(), Some("Chennai"));
        assert_eq!(fields.policy_duration, None);
    }

    #[tokio::test]
    async fn test_model_value_beats_fallback() {
        let reply = r#"{"age": 61, "location": "Nashik"}"#;
        let fields = extractor(vec![Ok(reply.to_string())])
            .extract_fields("29F moved from Pune")
            .await;
        assert_eq!(fields.age, Some(61));
        assert_eq!(fields.location.as_deref(), Some("Nashik"));
        // Gender absent from the model output, so the rule applies
        assert_eq!(fields.gender, Gender::Female);
    }

    #[tokio::test]
    async fn test_nothing_resolvable() {
        let fields = extractor(vec![Ok("no idea".to_string())])
            .extract_fields("is dental covered?")
            .await;
        assert_eq!(fields, ParsedFields::default());

        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 5);
    }

    #[test]
    fn test_lenient_age() {
        assert_eq!(lenient_age(&serde_json::json!(46)), Some(46));
        assert_eq!(lenient_age(&serde_json::json!(45.6)), Some(46));
        assert_eq!(lenient_age(&serde_json::json!("age 33")), Some(33));
        assert_eq!(lenient_age(&serde_json::json!(-4)), None);
        assert_eq!(lenient_age(&serde_json::json!(400)), None);
        assert_eq!(lenient_age(&serde_json::json!("unknown")), None);
    }
}
