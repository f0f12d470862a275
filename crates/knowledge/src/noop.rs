//! No-op knowledge lookup — responders run without grounding snippets.

use async_trait::async_trait;
use conclave_core::error::KnowledgeError;
use conclave_core::knowledge::{KnowledgeLookup, KnowledgeQuery, KnowledgeSnippet};

/// A lookup that never finds anything.
pub struct NoopKnowledge;

#[async_trait]
impl KnowledgeLookup for NoopKnowledge {
    fn name(&self) -> &str { "none" }

    async fn search(&self, _query: KnowledgeQuery) -> Result<Vec<KnowledgeSnippet>, KnowledgeError> {
        Ok(Vec::new())
    }
}
