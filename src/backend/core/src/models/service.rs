//! Service names and the ordered set of services a plan allows.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Services known to a default deployment.
pub const DEFAULT_SERVICES: &[&str] = &["storage", "compute", "database", "analytics", "ai", "messaging"];

/// Delimiter used by the string form of a [`ServiceSet`].
const DELIMITER: char = ',';

/// Ordered set of service-name tokens allowed by a plan.
///
/// The external form is a single comma-delimited string. Parsing splits on
/// `,` without trimming or escaping and keeps empty tokens; a repeated token
/// keeps its first position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceSet(Vec<String>);

impl ServiceSet {
    /// Parse the comma-delimited form.
    pub fn parse(raw: &str) -> Self {
        raw.split(DELIMITER).collect()
    }

    /// Whether `service` is one of the tokens.
    pub fn contains(&self, service: &str) -> bool {
        self.0.iter().any(|s| s == service)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render back to the comma-delimited form.
    pub fn to_delimited(&self) -> String {
        self.0.join(",")
    }
}

impl<S: Into<String>> FromIterator<S> for ServiceSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tokens: Vec<String> = Vec::new();
        for token in iter {
            let token = token.into();
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        Self(tokens)
    }
}

impl fmt::Display for ServiceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_delimited())
    }
}

impl Serialize for ServiceSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_delimited())
    }
}

impl<'de> Deserialize<'de> for ServiceSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// The vocabulary of service names a deployment exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceVocabulary(Vec<String>);

impl ServiceVocabulary {
    pub fn new<S: Into<String>>(services: impl IntoIterator<Item = S>) -> Self {
        Self(services.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, service: &str) -> bool {
        self.0.iter().any(|s| s == service)
    }
}

impl Default for ServiceVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICES.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_order_and_collapses_duplicates() {
        let set = ServiceSet::parse("storage,compute,storage,ai");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["storage", "compute", "ai"]);
        assert_eq!(set.to_delimited(), "storage,compute,ai");
    }

    #[test]
    fn test_parse_does_not_trim() {
        let set = ServiceSet::parse("storage, compute");
        assert!(set.contains("storage"));
        assert!(set.contains(" compute"));
        assert!(!set.contains("compute"));
    }

    #[test]
    fn test_parse_keeps_empty_tokens() {
        let set = ServiceSet::parse("storage,,ai");
        assert_eq!(set.len(), 3);
        assert!(set.contains(""));

        let empty = ServiceSet::parse("");
        assert_eq!(empty.len(), 1);
        assert_eq!(empty.to_delimited(), "");
    }

    #[test]
    fn test_serde_uses_delimited_string() {
        let set: ServiceSet = serde_json::from_str("\"database,analytics\"").unwrap();
        assert!(set.contains("analytics"));
        assert_eq!(serde_json::to_string(&set).unwrap(), "\"database,analytics\"");
    }

    #[test]
    fn test_default_vocabulary() {
        let vocabulary = ServiceVocabulary::default();
        for name in ["storage", "compute", "database", "analytics", "ai", "messaging"] {
            assert!(vocabulary.contains(name));
        }
        assert!(!vocabulary.contains("billing"));
    }
}
