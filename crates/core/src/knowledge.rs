//! Knowledge lookup — grounding snippets for responders.
//!
//! Given a capability and a query, a lookup returns zero or more ranked
//! snippets. Lookups are side-effect free from the engine's point of view;
//! snippets are requested and discarded per responder invocation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::capability::CapabilityId;
use crate::error::KnowledgeError;

/// A ranked piece of grounding text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSnippet {
    /// Capability whose search produced this snippet
    pub capability: CapabilityId,

    /// Document title
    pub title: String,

    /// Document body
    pub body: String,

    /// Relevance score (non-negative, higher = more relevant)
    pub score: f32,
}

/// A knowledge search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeQuery {
    /// The capability asking
    pub capability: CapabilityId,

    /// The collection to search (from the capability descriptor)
    pub collection: String,

    /// The search text
    pub text: String,

    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    3
}

impl KnowledgeQuery {
    pub fn new(
        capability: CapabilityId,
        collection: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            capability,
            collection: collection.into(),
            text: text.into(),
            limit: default_limit(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// The knowledge lookup collaborator.
#[async_trait]
pub trait KnowledgeLookup: Send + Sync {
    /// Backend name (e.g., "file", "memory", "none").
    fn name(&self) -> &str;

    /// Search for snippets relevant to the query, best first.
    async fn search(&self, query: KnowledgeQuery) -> Result<Vec<KnowledgeSnippet>, KnowledgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_limit() {
        let q = KnowledgeQuery::new("sql".into(), "sql", "joins");
        assert_eq!(q.limit, 3);
        assert_eq!(q.with_limit(7).limit, 7);
    }

    #[test]
    fn query_deserializes_without_limit() {
        let q: KnowledgeQuery = serde_json::from_str(
            r#"{"capability":"sql","collection":"sql","text":"joins"}"#,
        )
        .unwrap();
        assert_eq!(q.limit, 3);
        assert_eq!(q.capability, "sql");
    }
}
