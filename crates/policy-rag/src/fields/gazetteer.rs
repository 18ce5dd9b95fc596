//! Place-name lookup for the location fallback
//!
//! Cities are preferred over countries; within a tier the place mentioned
//! earliest in the question wins. Matching is case-insensitive on whole words.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

const CITIES: &[&str] = &[
    "Mumbai", "Delhi", "New Delhi", "Bangalore", "Bengaluru", "Hyderabad", "Ahmedabad",
    "Chennai", "Kolkata", "Pune", "Jaipur", "Surat", "Lucknow", "Kanpur", "Nagpur",
    "Indore", "Thane", "Bhopal", "Visakhapatnam", "Patna", "Vadodara", "Ghaziabad",
    "Ludhiana", "Agra", "Nashik", "Faridabad", "Meerut", "Rajkot", "Varanasi", "Srinagar",
    "Aurangabad", "Amritsar", "Navi Mumbai", "Prayagraj", "Ranchi", "Coimbatore",
    "Jabalpur", "Gwalior", "Vijayawada", "Jodhpur", "Madurai", "Raipur", "Kota",
    "Guwahati", "Chandigarh", "Mysore", "Mysuru", "Gurgaon", "Gurugram", "Noida",
    "Kochi", "Thiruvananthapuram", "Bhubaneswar", "Dehradun", "Mangalore", "Goa",
    "London", "New York", "Singapore", "Dubai", "Toronto", "Sydney", "Paris", "Tokyo",
];

const COUNTRIES: &[&str] = &[
    "India", "United States", "USA", "United Kingdom", "UK", "Canada", "Australia",
    "Singapore", "United Arab Emirates", "UAE", "Germany", "France", "Japan", "Nepal",
    "Bangladesh", "Sri Lanka", "Pakistan", "China",
];

/// Extra entries loaded from a TOML file
#[derive(Debug, Default, Deserialize)]
struct GazetteerFile {
    #[serde(default)]
    cities: Vec<String>,
    #[serde(default)]
    countries: Vec<String>,
}

/// City and country names
#[derive(Debug, Clone)]
pub struct Gazetteer {
    cities: Vec<String>,
    countries: Vec<String>,
}

impl Gazetteer {
    /// Built-in lists
    pub fn builtin() -> Self {
        Self {
            cities: CITIES.iter().map(|s| s.to_string()).collect(),
            countries: COUNTRIES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Built-in lists extended with a TOML file (`cities = [...]`, `countries = [...]`)
    pub fn with_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read gazetteer {}: {}", path.display(), e))
        })?;
        let extra: GazetteerFile = toml::from_str(&raw)
            .map_err(|e| Error::config(format!("Invalid gazetteer {}: {}", path.display(), e)))?;

        let mut gazetteer = Self::builtin();
        gazetteer.cities.extend(extra.cities);
        gazetteer.countries.extend(extra.countries);
        tracing::debug!(
            "Gazetteer: {} cities, {} countries",
            gazetteer.cities.len(),
            gazetteer.countries.len()
        );
        Ok(gazetteer)
    }

    /// Built-in lists, plus a file when one is configured
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::with_file(path),
            None => Ok(Self::builtin()),
        }
    }

    /// Find the place the question refers to
    pub fn locate(&self, query: &str) -> Option<String> {
        let haystack = query.to_lowercase();
        earliest(&haystack, &self.cities).or_else(|| earliest(&haystack, &self.countries))
    }
}

impl Default for Gazetteer {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Earliest whole-word mention; at equal positions the longer name wins
fn earliest(haystack: &str, names: &[String]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| first_word_match(haystack, &name.to_lowercase()).map(|pos| (pos, name)))
        .min_by(|(pa, a), (pb, b)| pa.cmp(pb).then_with(|| b.len().cmp(&a.len())))
        .map(|(_, name)| name.clone())
}

fn first_word_match(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.match_indices(needle).map(|(pos, _)| pos).find(|&pos| {
        let before = haystack[..pos].chars().next_back();
        let after = haystack[pos + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
