//! Capability registry — the read-only table of capabilities, in
//! declaration order.
//!
//! Built once at startup and shared by the router and dispatcher behind an
//! `Arc`. Declaration order matters: it breaks keyword-score ties.

use std::collections::HashMap;
use conclave_core::capability::{CapabilityDescriptor, CapabilityId, KeywordMatcher};

use crate::error::RegistryError;

/// Immutable capability table.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    descriptors: Vec<CapabilityDescriptor>,
    index: HashMap<CapabilityId, usize>,
    /// Keyword patterns, parallel to `descriptors`
    matchers: Vec<KeywordMatcher>,
}

impl CapabilityRegistry {
    /// Build a registry. Rejects an empty table, blank ids and duplicates.
    pub fn new(descriptors: Vec<CapabilityDescriptor>) -> Result<Self, RegistryError> {
        if descriptors.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut index = HashMap::with_capacity(descriptors.len());
        for (pos, descriptor) in descriptors.iter().enumerate() {
            if descriptor.id.as_str().trim().is_empty() {
                return Err(RegistryError::EmptyId);
            }
            if index.insert(descriptor.id.clone(), pos).is_some() {
                return Err(RegistryError::DuplicateId(descriptor.id.to_string()));
            }
        }

        let matchers = descriptors
            .iter()
            .map(|d| KeywordMatcher::new(d.keywords.as_slice()))
            .collect();

        Ok(Self {
            descriptors,
            index,
            matchers,
        })
    }

    /// Look up a capability by id.
    pub fn resolve(&self, id: &str) -> Result<&CapabilityDescriptor, RegistryError> {
        self.index
            .get(&CapabilityId::new(id))
            .map(|&pos| &self.descriptors[pos])
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(&CapabilityId::new(id))
    }

    /// All descriptors, in declaration order.
    pub fn all(&self) -> &[CapabilityDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Keyword match count per capability, in declaration order.
    pub fn score_keywords(&self, text: &str) -> Vec<(&CapabilityId, usize)> {
        self.descriptors
            .iter()
            .zip(&self.matchers)
            .map(|(d, matcher)| (&d.id, matcher.count(text)))
            .collect()
    }

    /// The capability with the most keyword matches and its match count, if
    /// any scored above zero. Ties go to the first declared.
    pub fn best_keyword_match(&self, text: &str) -> Option<(&CapabilityDescriptor, usize)> {
        let mut best: Option<(usize, usize)> = None;
        for (pos, (_, score)) in self.score_keywords(text).into_iter().enumerate() {
            if score > 0 && best.is_none_or(|(_, top)| score > top) {
                best = Some((pos, score));
            }
        }
        best.map(|(pos, score)| (&self.descriptors[pos], score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_core::capability::Persona;

    fn registry() -> CapabilityRegistry {
        CapabilityRegistry::new(vec![
            CapabilityDescriptor::new("database", "SQL Agent", Persona::Database)
                .with_keywords(["sql", "warehouse", "capacity", "orders"]),
            CapabilityDescriptor::new("csharp", "C# Agent", Persona::CSharp)
                .with_keywords(["c#", "linq", "orders"]),
            CapabilityDescriptor::new("general", "General Assistant", Persona::General),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_empty_registry() {
        assert_eq!(CapabilityRegistry::new(vec![]).unwrap_err(), RegistryError::Empty);
    }

    #[test]
    fn rejects_duplicates_and_blank_ids() {
        let dup = CapabilityRegistry::new(vec![
            CapabilityDescriptor::new("sql", "A", Persona::Database),
            CapabilityDescriptor::new("sql", "B", Persona::Database),
        ]);
        assert_eq!(dup.unwrap_err(), RegistryError::DuplicateId("sql".into()));

        let blank = CapabilityRegistry::new(vec![CapabilityDescriptor::new(" ", "A", Persona::General)]);
        assert_eq!(blank.unwrap_err(), RegistryError::EmptyId);
    }

    #[test]
    fn resolve_known_and_unknown() {
        let reg = registry();
        assert_eq!(reg.resolve("csharp").unwrap().label, "C# Agent");
        assert_eq!(
            reg.resolve("cobol").unwrap_err(),
            RegistryError::NotFound("cobol".into())
        );
        assert!(reg.contains("general"));
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn scores_in_declaration_order() {
        let reg = registry();
        let scores = reg.score_keywords("What is the capacity of warehouse RDU?");
        let flat: Vec<(&str, usize)> = scores.iter().map(|(id, s)| (id.as_str(), *s)).collect();
        assert_eq!(flat, vec![("database", 2), ("csharp", 0), ("general", 0)]);
    }

    #[test]
    fn best_match_prefers_highest_score() {
        let reg = registry();
        let (best, score) = reg.best_keyword_match("LINQ over orders in C#").unwrap();
        assert_eq!(best.id, "csharp");
        assert_eq!(score, 3);
    }

    #[test]
    fn ties_go_to_first_declared() {
        let reg = registry();
        assert_eq!(reg.best_keyword_match("list the orders").unwrap().0.id, "database");
    }

    #[test]
    fn no_match_is_none() {
        assert!(registry().best_keyword_match("tell me a joke").is_none());
    }
}
