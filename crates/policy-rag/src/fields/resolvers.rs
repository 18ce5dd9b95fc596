//! Ordered fallback chains for individual fields
//!
//! Each field has its own chain of resolvers. A value supplied by the model
//! wins outright; otherwise resolvers run in order over the raw question and
//! the first one that produces a value wins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Gender;

/// A named, pure function from question text to a field value
pub struct Resolver<T> {
    name: &'static str,
    resolve: Box<dyn Fn(&str) -> Option<T> + Send + Sync>,
}

impl<T> Resolver<T> {
    /// Wrap a resolver function
    pub fn new(name: &'static str, resolve: impl Fn(&str) -> Option<T> + Send + Sync + 'static) -> Self {
        Self {
            name,
            resolve: Box::new(resolve),
        }
    }

    /// Resolver name for logs
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// First-success chain for one field
pub struct FieldChain<T> {
    field: &'static str,
    resolvers: Vec<Resolver<T>>,
}

impl<T: std::fmt::Debug> FieldChain<T> {
    /// Empty chain for a field
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            resolvers: Vec::new(),
        }
    }

    /// Append a resolver
    pub fn then(mut self, resolver: Resolver<T>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// Resolver names, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(Resolver::name).collect()
    }

    /// Resolve with the model's value first, then each fallback
    pub fn resolve(&self, primary: Option<T>, query: &str) -> Option<T> {
        if let Some(value) = primary {
            tracing::debug!("{}: {:?} from model", self.field, value);
            return Some(value);
        }

        for resolver in &self.resolvers {
            if let Some(value) = (resolver.resolve)(query) {
                tracing::debug!("{}: {:?} from {}", self.field, value, resolver.name);
                return Some(value);
            }
        }

        tracing::debug!("{}: unresolved", self.field);
        None
    }
}

static AGE_MARKER: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{2})\s*-?\s*(?:years?|yrs?)?\s*-?\s*old\b|\baged?\s*[:=]?\s*(\d{2})\b").ok()
});

static COMPACT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{2,3})\s?([mf])\b").ok());

static FEMALE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:female|woman|women)\b").ok());

static MALE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?i)\b(?:male|man|men)\b").ok());

/// Plausible human age
pub fn plausible_age(age: u32) -> Option<u32> {
    (1..=120).contains(&age).then_some(age)
}

/// "46 years old", "46-year-old", "46 yrs old", "aged 46"
pub fn age_from_marker(query: &str) -> Option<u32> {
    let re = AGE_MARKER.as_ref()?;
    re.captures_iter(query).find_map(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| m.as_str().parse().ok())
            .and_then(plausible_age)
    })
}

/// "29F", "45m", "46 M"
pub fn age_from_compact(query: &str) -> Option<u32> {
    let re = COMPACT.as_ref()?;
    re.captures_iter(query)
        .find_map(|caps| caps[1].parse().ok().and_then(plausible_age))
}

/// Explicit "female" / "woman"
pub fn gender_from_female_word(query: &str) -> Option<Gender> {
    FEMALE.as_ref()?.is_match(query).then_some(Gender::Female)
}

/// Explicit "male" / "man"
pub fn gender_from_male_word(query: &str) -> Option<Gender> {
    MALE.as_ref()?.is_match(query).then_some(Gender::Male)
}

fn compact_gender(query: &str, marker: &str) -> bool {
    COMPACT.as_ref().is_some_and(|re| {
        re.captures_iter(query)
            .any(|caps| caps[2].eq_ignore_ascii_case(marker))
    })
}

/// Compact "29F"
pub fn gender_from_compact_female(query: &str) -> Option<Gender> {
    compact_gender(query, "f").then_some(Gender::Female)
}

/// Compact "46M"
pub fn gender_from_compact_male(query: &str) -> Option<Gender> {
    compact_gender(query, "m").then_some(Gender::Male)
}

/// Age chain: marker phrase, then compact form
pub fn age_chain() -> FieldChain<u32> {
    FieldChain::new("age")
        .then(Resolver::new("age marker", age_from_marker))
        .then(Resolver::new("compact age", age_from_compact))
}

/// Gender chain: explicit words first (female before male), then compact forms
pub fn gender_chain() -> FieldChain<Gender> {
    FieldChain::new("gender")
        .then(Resolver::new("female word", gender_from_female_word))
        .then(Resolver::new("male word", gender_from_male_word))
        .then(Resolver::new("compact female", gender_from_compact_female))
        .then(Resolver::new("compact male", gender_from_compact_male))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_marker_forms() {
        assert_eq!(age_from_marker("a 46 year old man"), Some(46));
        assert_eq!(age_from_marker("46-year-old male"), Some(46));
        assert_eq!(age_from_marker("she is 62 yrs old"), Some(62));
        assert_eq!(age_from_marker("patient is 35 old"), Some(35));
        assert_eq!(age_from_marker("aged 71, hip replacement"), Some(71));
        assert_eq!(age_from_marker("3 month policy"), None);
        assert_eq!(age_from_marker("my policy is 3 years old"), None);
    }

    #[test]
    fn test_policy_age_does_not_hide_compact_age() {
        let chain = age_chain();
        assert_eq!(
            chain.resolve(None, "46M, my policy is 3 years old, knee surgery in Pune"),
            Some(46)
        );
    }

    #[test]
    fn test_compact_forms() {
        assert_eq!(age_from_compact("29F needs knee surgery"), Some(29));
        assert_eq!(age_from_compact("46 M, Pune"), Some(46));
        assert_eq!(gender_from_compact_female("29F needs knee surgery"), Some(Gender::Female));
        assert_eq!(gender_from_compact_male("29F needs knee surgery"), None);
        assert_eq!(gender_from_compact_male("46m, 3-month policy"), Some(Gender::Male));
        assert_eq!(age_from_compact("policy 2024m"), None);
    }

    #[test]
    fn test_female_not_mistaken_for_male() {
        let chain = gender_chain();
        assert_eq!(chain.resolve(None, "female patient, 40"), Some(Gender::Female));
        assert_eq!(chain.resolve(None, "Male, 40"), Some(Gender::Male));
        assert_eq!(chain.resolve(None, "knee surgery in Pune"), None);
    }

    #[test]
    fn test_primary_wins() {
        let chain = age_chain();
        assert_eq!(chain.resolve(Some(50), "29F"), Some(50));
        assert_eq!(chain.resolve(None, "29F"), Some(29));
        assert_eq!(chain.names(), vec!["age marker", "compact age"]);
    }
}
