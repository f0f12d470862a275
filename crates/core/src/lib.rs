//! # Conclave Core
//!
//! Domain types, traits, and error definitions for the Conclave multi-agent
//! router. This crate has **no framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in
//! their respective crates:
//! - [`Provider`] — text generation (`conclave-providers`)
//! - [`Classifier`] — text classification (`conclave-agent`, LLM-backed)
//! - [`KnowledgeLookup`] — grounding snippets (`conclave-knowledge`)

pub mod capability;
pub mod classifier;
pub mod error;
pub mod knowledge;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use capability::{CapabilityDescriptor, CapabilityId, Persona};
pub use classifier::{Classifier, ClassifierVerdict, Confidence, ExecutionMode};
pub use error::{ClassifierError, KnowledgeError, ProviderError};
pub use knowledge::{KnowledgeLookup, KnowledgeQuery, KnowledgeSnippet};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
