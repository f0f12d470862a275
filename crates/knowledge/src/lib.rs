//! Knowledge lookup implementations for Conclave.

pub mod file_backend;
pub mod in_memory;
pub mod noop;
pub mod scoring;

pub use file_backend::FileKnowledgeBase;
pub use in_memory::InMemoryKnowledge;
pub use noop::NoopKnowledge;
pub use scoring::Document;

use conclave_config::AppConfig;
use conclave_core::error::KnowledgeError;
use conclave_core::knowledge::KnowledgeLookup;
use std::sync::Arc;
use tracing::info;

/// Build the configured knowledge backend.
///
/// The file backend serves every capability's collection plus the shared one.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn KnowledgeLookup>, KnowledgeError> {
    let backend: Arc<dyn KnowledgeLookup> = match config.knowledge.backend.as_str() {
        "file" => Arc::new(file_backend_from_config(config)?),
        "memory" => Arc::new(InMemoryKnowledge::new(&config.knowledge.shared_collection)),
        "none" => Arc::new(NoopKnowledge),
        other => {
            return Err(KnowledgeError::Storage(format!(
                "Unknown knowledge backend '{other}' (expected file, memory or none)"
            )));
        }
    };
    info!(backend = backend.name(), "Knowledge lookup initialised");
    Ok(backend)
}

/// The file backend for this configuration, regardless of `knowledge.backend`.
pub fn file_backend_from_config(config: &AppConfig) -> Result<FileKnowledgeBase, KnowledgeError> {
    FileKnowledgeBase::new(
        config.knowledge_dir(),
        config.capability_descriptors().into_iter().map(|d| d.collection),
        config.knowledge.shared_collection.clone(),
    )
}
