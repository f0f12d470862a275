//! Router — turns a query into a [`RoutingDecision`].
//!
//! The classifier is asked first, under an explicit timeout. Any failure
//! (unavailable, timed out, malformed, inconsistent) falls through to a
//! deterministic keyword scorer, so `route` always returns a decision whose
//! capabilities exist in the registry.

use std::sync::Arc;
use std::time::Duration;
use conclave_core::capability::CapabilityId;
use conclave_core::classifier::{Classifier, ClassifierVerdict, Confidence, ExecutionMode};
use conclave_core::error::ClassifierError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EngineError, RegistryError};
use crate::guard::{CallGuard, Interrupt};
use crate::registry::CapabilityRegistry;

/// Where a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    Classifier,
    Fallback,
}

impl std::fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DecisionSource::Classifier => "classifier",
            DecisionSource::Fallback => "fallback",
        })
    }
}

/// A validated routing decision.
///
/// Invariants: every id is registered, the primary never appears among the
/// supporting ids, and `Single` mode has no supporting ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub primary: CapabilityId,
    #[serde(default)]
    pub supporting: Vec<CapabilityId>,
    pub mode: ExecutionMode,
    pub confidence: Confidence,
    #[serde(default)]
    pub rationale: String,
    pub source: DecisionSource,
}

impl RoutingDecision {
    /// Primary first, then supporting ids in listed order.
    pub fn participants(&self) -> impl Iterator<Item = &CapabilityId> {
        std::iter::once(&self.primary).chain(self.supporting.iter())
    }

    pub fn participant_count(&self) -> usize {
        1 + self.supporting.len()
    }

    /// Check a classifier verdict against the registry.
    ///
    /// Duplicate supporters and supporters equal to the primary are dropped.
    /// A multi-responder mode left with no supporters becomes `Single`.
    pub fn from_verdict(
        verdict: ClassifierVerdict,
        registry: &CapabilityRegistry,
    ) -> Result<Self, ClassifierError> {
        let known = |id: &str| -> Result<CapabilityId, ClassifierError> {
            let id = id.trim();
            registry
                .resolve(id)
                .map(|d| d.id.clone())
                .map_err(|_| ClassifierError::UnknownCapability(id.to_string()))
        };

        let primary = known(verdict.primary.as_str())?;

        let mut supporting: Vec<CapabilityId> = Vec::with_capacity(verdict.supporting.len());
        for raw in &verdict.supporting {
            let id = known(raw.as_str())?;
            if id != primary && !supporting.contains(&id) {
                supporting.push(id);
            }
        }

        let mode = match verdict.mode {
            ExecutionMode::Single if !supporting.is_empty() => {
                return Err(ClassifierError::InconsistentDecision(format!(
                    "single mode with {} supporting capabilities",
                    supporting.len()
                )));
            }
            ExecutionMode::Sequential | ExecutionMode::Parallel if supporting.is_empty() => {
                ExecutionMode::Single
            }
            mode => mode,
        };

        Ok(Self {
            primary,
            supporting,
            mode,
            confidence: verdict.confidence,
            rationale: verdict.rationale,
            source: DecisionSource::Classifier,
        })
    }

    /// Verify the invariants against a registry. Used to reject decisions
    /// that were not produced by this router.
    pub fn validate(&self, registry: &CapabilityRegistry) -> Result<(), EngineError> {
        for id in self.participants() {
            registry.resolve(id.as_str())?;
        }
        if self.mode == ExecutionMode::Single && !self.supporting.is_empty() {
            return Err(EngineError::configuration(format!(
                "single mode decision lists {} supporting capabilities",
                self.supporting.len()
            )));
        }
        Ok(())
    }
}

/// The router. Cheap to share; holds no per-request state.
pub struct Router {
    registry: Arc<CapabilityRegistry>,
    classifier: Option<Arc<dyn Classifier>>,
    classify_timeout: Duration,
    default_capability: CapabilityId,
}

impl Router {
    /// Create a router that only uses the keyword fallback.
    ///
    /// `default_capability` must be registered.
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        default_capability: &str,
    ) -> Result<Self, RegistryError> {
        let default_capability = registry.resolve(default_capability)?.id.clone();
        Ok(Self {
            registry,
            classifier: None,
            classify_timeout: Duration::from_millis(8_000),
            default_capability,
        })
    }

    /// Consult `classifier` first, bounded by `timeout`.
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>, timeout: Duration) -> Self {
        self.classifier = Some(classifier);
        self.classify_timeout = timeout;
        self
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn default_capability(&self) -> &CapabilityId {
        &self.default_capability
    }

    /// Route a query with no caller deadline.
    pub async fn route(&self, query: &str) -> RoutingDecision {
        self.route_with(query, &CallGuard::unbounded()).await
    }

    /// Route a query. Never fails.
    pub async fn route_with(&self, query: &str, guard: &CallGuard) -> RoutingDecision {
        let Some(classifier) = &self.classifier else {
            debug!("No classifier configured, using keyword routing");
            return self.fallback(query, "no classifier configured");
        };

        match self.classify(classifier.as_ref(), query, guard).await {
            Ok(decision) => {
                info!(
                    primary = %decision.primary,
                    supporting = decision.supporting.len(),
                    mode = %decision.mode,
                    confidence = %decision.confidence,
                    classifier = classifier.name(),
                    "Query routed"
                );
                decision
            }
            Err(e) => {
                warn!(error = %e, classifier = classifier.name(), "Classification failed, using keyword fallback");
                self.fallback(query, &e.to_string())
            }
        }
    }

    async fn classify(
        &self,
        classifier: &dyn Classifier,
        query: &str,
        guard: &CallGuard,
    ) -> Result<RoutingDecision, ClassifierError> {
        let call = classifier.classify(query, self.registry.all());
        let verdict = match guard.run(Some(self.classify_timeout), call).await {
            Ok(result) => result?,
            Err(Interrupt::TimedOut(limit)) => {
                return Err(ClassifierError::Timeout {
                    timeout_ms: limit.as_millis() as u64,
                });
            }
            Err(Interrupt::DeadlineExceeded) => {
                return Err(ClassifierError::Unavailable("request deadline exceeded".into()));
            }
            Err(Interrupt::Cancelled) => {
                return Err(ClassifierError::Unavailable("request cancelled".into()));
            }
        };
        RoutingDecision::from_verdict(verdict, &self.registry)
    }

    /// Deterministic keyword routing. Total: always returns a valid decision.
    pub fn fallback(&self, query: &str, reason: &str) -> RoutingDecision {
        let (primary, rationale) = match self.registry.best_keyword_match(query) {
            Some((descriptor, matched)) => (
                descriptor.id.clone(),
                format!(
                    "Keyword fallback ({reason}): {} matched {matched} keyword(s)",
                    descriptor.id
                ),
            ),
            None => (
                self.default_capability.clone(),
                format!("Keyword fallback ({reason}): no keywords matched, using default"),
            ),
        };

        info!(primary = %primary, "Query routed by keyword fallback");

        RoutingDecision {
            primary,
            supporting: Vec::new(),
            mode: ExecutionMode::Single,
            confidence: Confidence::Low,
            rationale,
            source: DecisionSource::Fallback,
        }
    }
}
