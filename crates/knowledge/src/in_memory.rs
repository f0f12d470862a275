//! In-memory knowledge base — same scoring as the file backend, no disk.

use async_trait::async_trait;
use conclave_core::error::KnowledgeError;
use conclave_core::knowledge::{KnowledgeLookup, KnowledgeQuery, KnowledgeSnippet};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::scoring::{self, Document};

/// Knowledge base held entirely in memory, keyed by collection.
pub struct InMemoryKnowledge {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    shared_collection: String,
}

impl InMemoryKnowledge {
    pub fn new(shared_collection: impl Into<String>) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            shared_collection: shared_collection.into(),
        }
    }

    /// Builder-style seeding, for setup code that is not async.
    pub fn with_document(
        mut self,
        collection: &str,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        self.collections
            .get_mut()
            .entry(collection.to_string())
            .or_default()
            .push(Document::new(title, body));
        self
    }

    pub async fn add_document(&self, collection: &str, title: &str, body: &str) {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(Document::new(title, body));
    }

    pub async fn count(&self) -> usize {
        self.collections.read().await.values().map(Vec::len).sum()
    }
}

impl Default for InMemoryKnowledge {
    fn default() -> Self {
        Self::new("shared")
    }
}

#[async_trait]
impl KnowledgeLookup for InMemoryKnowledge {
    fn name(&self) -> &str {
        "memory"
    }

    async fn search(&self, query: KnowledgeQuery) -> Result<Vec<KnowledgeSnippet>, KnowledgeError> {
        let collections = self.collections.read().await;

        let own = collections.get(&query.collection).into_iter().flatten();
        let shared = collections
            .get(&self.shared_collection)
            .filter(|_| query.collection != self.shared_collection)
            .into_iter()
            .flatten();

        Ok(scoring::rank(own.chain(shared), &query.text, query.limit)
            .into_iter()
            .map(|(doc, score)| KnowledgeSnippet {
                capability: query.capability.clone(),
                title: doc.title.clone(),
                body: doc.body.clone(),
                score: score as f32,
            })
            .collect())
    }
}
