//! Capability descriptors — the static vocabulary of expertise domains.
//!
//! A capability is a named domain (database querying, C#/.NET, ERP, general
//! help) served by exactly one responder. Descriptors are created once at
//! startup from configuration and never mutated afterwards.

use regex_lite::Regex;
use std::collections::HashSet;
use serde::{Deserialize, Serialize};

/// Stable identifier of a capability (e.g. `"database"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityId(pub String);

impl CapabilityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for CapabilityId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CapabilityId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Which specialist prompt family serves a capability.
///
/// This is a closed set: adding a capability with new behavior means adding
/// a variant here plus one registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    /// SQL and relational data questions
    Database,
    /// C#, .NET, ASP.NET, LINQ, Entity Framework
    #[serde(rename = "csharp")]
    CSharp,
    /// Epicor Prophet 21 ERP configuration and integration
    Erp,
    /// Anything else
    General,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Database => "database",
            Persona::CSharp => "csharp",
            Persona::Erp => "erp",
            Persona::General => "general",
        }
    }
}

/// Immutable description of one capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Unique, stable identifier
    pub id: CapabilityId,

    /// Human-readable label (used in transcripts and synthesis headings)
    pub label: String,

    /// Ordered matching keywords for the fallback scorer
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Name of the knowledge collection consulted by this capability's responder
    pub collection: String,

    /// Prompt family used by the responder
    pub persona: Persona,
}

impl CapabilityDescriptor {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        persona: Persona,
    ) -> Self {
        let id = id.into();
        Self {
            collection: id.clone(),
            id: CapabilityId(id),
            label: label.into(),
            keywords: Vec::new(),
            persona,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Number of distinct keywords that occur in `text` as whole terms
    /// (case-insensitive).
    ///
    /// Compiles the patterns on every call; hot paths hold a
    /// [`KeywordMatcher`] instead.
    pub fn keyword_matches(&self, text: &str) -> usize {
        KeywordMatcher::new(self.keywords.as_slice()).count(text)
    }
}

/// Whole-term patterns for one capability's keywords, compiled once.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    patterns: Vec<Regex>,
}

impl KeywordMatcher {
    /// Blank and repeated keywords are ignored.
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let mut seen = HashSet::new();
        let patterns = keywords
            .iter()
            .map(|kw| kw.as_ref().trim().to_lowercase())
            .filter(|kw| !kw.is_empty() && seen.insert(kw.clone()))
            .filter_map(|kw| term_pattern(&kw))
            .collect();
        Self { patterns }
    }

    /// Number of keywords found in `text`.
    pub fn count(&self, text: &str) -> usize {
        let haystack = text.to_lowercase();
        self.patterns.iter().filter(|re| re.is_match(&haystack)).count()
    }
}

/// Pattern matching `term` as a whole term.
///
/// `\b` is only anchored on a side where the term begins or ends with a
/// word character, so `c#`, `.net` and `asp.net` behave as expected while
/// `sql` does not match inside `mysql`.
pub fn term_pattern(term: &str) -> Option<Regex> {
    if term.is_empty() {
        return None;
    }
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let head = if term.starts_with(is_word) { r"\b" } else { "" };
    let tail = if term.ends_with(is_word) { r"\b" } else { "" };
    Regex::new(&format!("{head}{}{tail}", regex_lite::escape(term))).ok()
}

/// Whether `needle` occurs in `haystack` as a whole term.
pub fn contains_term(haystack: &str, needle: &str) -> bool {
    term_pattern(needle).is_some_and(|re| re.is_match(haystack))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database() -> CapabilityDescriptor {
        CapabilityDescriptor::new("database", "Database Agent", Persona::Database)
            .with_keywords(["warehouse", "capacity", "orders", "how many", "sql"])
    }

    #[test]
    fn collection_defaults_to_id() {
        assert_eq!(database().collection, "database");
        let d = database().with_collection("sql");
        assert_eq!(d.collection, "sql");
    }

    #[test]
    fn keyword_matches_counts_distinct_terms() {
        let d = database();
        assert_eq!(d.keyword_matches("What is the capacity of warehouse RDU?"), 2);
        assert_eq!(d.keyword_matches("How many ORDERS shipped?"), 2);
        assert_eq!(d.keyword_matches("Tell me a joke"), 0);
    }

    #[test]
    fn terms_respect_word_boundaries() {
        assert!(!contains_term("we use mysql here", "sql"));
        assert!(contains_term("write sql for me", "sql"));
        assert!(contains_term("is c# fast?", "c#"));
        assert!(contains_term("an asp.net controller", "asp.net"));
        assert!(contains_term("migrating to .net 8", ".net"));
        assert!(!contains_term("capacity", "api"));
    }

    #[test]
    fn empty_needle_never_matches() {
        assert!(!contains_term("anything", ""));
        let d = CapabilityDescriptor::new("x", "X", Persona::General).with_keywords(["", "  "]);
        assert_eq!(d.keyword_matches("anything"), 0);
    }

    #[test]
    fn matcher_ignores_repeated_keywords() {
        let matcher = KeywordMatcher::new(&["SQL", "sql", "orders"]);
        assert_eq!(matcher.count("sql over the orders table"), 2);
        assert_eq!(matcher.count("MySQL"), 0);
    }

    #[test]
    fn capability_id_serializes_transparently() {
        let json = serde_json::to_string(&CapabilityId::new("csharp")).unwrap();
        assert_eq!(json, "\"csharp\"");
    }

    #[test]
    fn persona_parses_snake_case() {
        let p: Persona = serde_json::from_str("\"csharp\"").unwrap();
        assert_eq!(p, Persona::CSharp);
        assert_eq!(p.as_str(), "csharp");
    }
}
