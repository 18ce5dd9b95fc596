//! Structured fields derived from a claim question

use serde::{Deserialize, Serialize};

/// Claimant gender as stated in the question
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male
    Male,
    /// Female
    Female,
    /// Not stated or not recognised
    #[default]
    Unknown,
}

impl Gender {
    /// Lenient parse of free-form model output ("F", "Female", "woman", ...)
    pub fn parse_loose(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "f" | "female" | "woman" | "w" => Self::Female,
            "m" | "male" | "man" => Self::Male,
            _ => Self::Unknown,
        }
    }

    /// Whether a value was determined
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Fixed set of optional slots extracted from a question
///
/// Partial population is the normal case. Every key is always serialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedFields {
    /// Claimant age in years
    pub age: Option<u32>,
    /// Claimant gender
    #[serde(default)]
    pub gender: Gender,
    /// Medical procedure or treatment
    pub procedure: Option<String>,
    /// City or country of treatment
    pub location: Option<String>,
    /// How long the policy has been held ("3 months", "2 years")
    pub policy_duration: Option<String>,
}

impl ParsedFields {
    /// Number of populated slots
    pub fn populated(&self) -> usize {
        [
            self.age.is_some(),
            self.gender.is_known(),
            self.procedure.is_some(),
            self.location.is_some(),
            self.policy_duration.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}
