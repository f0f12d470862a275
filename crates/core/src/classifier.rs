//! Classifier trait — the abstraction over the text classification service.
//!
//! The classifier sees the query plus the enumerated capabilities and
//! answers with a [`ClassifierVerdict`]. The verdict is only a proposal:
//! the router validates it against the registry before turning it into a
//! routing decision.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::capability::CapabilityDescriptor;
use crate::error::ClassifierError;

/// How the chosen responders execute relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One responder, no collaboration
    Single,
    /// Chained; each step sees the transcript so far
    Sequential,
    /// Concurrent and independent; joined before synthesis
    Parallel,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ExecutionMode::Single => "single",
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Parallel => "parallel",
        })
    }
}

/// How sure the router is about its decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        })
    }
}

/// The structured answer of the classification service, as parsed.
///
/// Ids are kept as raw strings here; the router checks them against the
/// registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierVerdict {
    pub primary: String,

    #[serde(default)]
    pub supporting: Vec<String>,

    pub mode: ExecutionMode,

    pub confidence: Confidence,

    #[serde(default)]
    pub rationale: String,
}

/// The text classification service.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// A human-readable name for this classifier.
    fn name(&self) -> &str;

    /// Classify a query against the available capabilities.
    ///
    /// Implementations do not need to enforce a timeout; the router wraps
    /// every call in one.
    async fn classify(
        &self,
        query: &str,
        capabilities: &[CapabilityDescriptor],
    ) -> Result<ClassifierVerdict, ClassifierError>;
}
