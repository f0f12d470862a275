//! Engine — the one entry point the presentation layer calls.
//!
//! `handle_request` runs the whole pipeline for one query:
//!
//! 1. **Route** the query (classifier, or keyword fallback)
//! 2. **Dispatch** the decision to the chosen responders
//! 3. **Synthesize** the transcript into a final answer
//!
//! and returns the answer together with the full session.

use std::sync::Arc;
use std::time::Duration;
use conclave_config::AppConfig;
use conclave_core::knowledge::KnowledgeLookup;
use conclave_core::provider::Provider;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::classifier::LlmClassifier;
use crate::dispatcher::Dispatcher;
use crate::error::EngineError;
use crate::guard::CallGuard;
use crate::registry::CapabilityRegistry;
use crate::router::{Router, RoutingDecision};
use crate::session::{CollaborationSession, SessionStatus};
use crate::specialist::{ResponderLimits, SpecialistResponder};
use crate::synthesizer;

/// Per-request controls.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Cancels every in-flight external call of the request
    pub cancel: CancellationToken,
    /// Overall time budget, measured from the start of the request
    pub deadline: Option<Duration>,
}

impl RequestOptions {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// The result of one request.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub final_answer: String,
    pub session: CollaborationSession,
}

/// Router + dispatcher over a shared registry.
pub struct Engine {
    registry: Arc<CapabilityRegistry>,
    router: Router,
    dispatcher: Dispatcher,
}

impl Engine {
    /// Assemble an engine. Every registered capability needs a responder.
    pub fn new(router: Router, dispatcher: Dispatcher) -> Result<Self, EngineError> {
        dispatcher.ensure_complete()?;
        Ok(Self {
            registry: router.registry().clone(),
            router,
            dispatcher,
        })
    }

    /// Build the engine described by the configuration, using the
    /// configured providers and knowledge backend.
    pub fn from_config(config: &AppConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let providers = conclave_providers::build_from_config(config);
        let provider = providers
            .chain(Duration::from_secs(config.responder.timeout_secs))
            .ok_or_else(|| {
                EngineError::configuration(format!(
                    "provider '{}' is not available",
                    config.default_provider
                ))
            })?;
        let knowledge = conclave_knowledge::build_from_config(config)?;

        Self::with_collaborators(config, provider, knowledge)
    }

    /// Build from configuration with explicit collaborators.
    pub fn with_collaborators(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        knowledge: Arc<dyn KnowledgeLookup>,
    ) -> Result<Self, EngineError> {
        let registry = Arc::new(CapabilityRegistry::new(config.capability_descriptors())?);

        let mut router = Router::new(registry.clone(), &config.router.default_capability)?;
        let keyless = config.default_provider == "ollama";
        if config.router.use_classifier && (config.has_api_key() || keyless) {
            let model = config
                .router
                .model
                .clone()
                .unwrap_or_else(|| config.default_model.clone());
            router = router.with_classifier(
                Arc::new(LlmClassifier::new(provider.clone(), model)),
                Duration::from_millis(config.router.classify_timeout_ms),
            );
        } else {
            warn!("Classifier disabled (no API key or router.use_classifier = false), routing by keywords only");
        }

        let limits = ResponderLimits {
            model: config.default_model.clone(),
            temperature: config
                .responder
                .temperature
                .unwrap_or(config.default_temperature),
            max_tokens: Some(config.default_max_tokens),
            max_context_messages: config.responder.max_context_messages,
            max_snippets: config.responder.max_snippets,
        };

        let mut dispatcher = Dispatcher::new(registry.clone())
            .with_max_parallel(config.dispatch.max_parallel)
            .with_call_timeout(Duration::from_secs(config.responder.timeout_secs));
        for descriptor in registry.all() {
            dispatcher.register(Arc::new(SpecialistResponder::new(
                descriptor.clone(),
                provider.clone(),
                knowledge.clone(),
                limits.clone(),
            )))?;
        }

        info!(
            capabilities = registry.len(),
            classifier = router.has_classifier(),
            provider = provider.name(),
            knowledge = knowledge.name(),
            "Engine ready"
        );

        Self::new(router, dispatcher)
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Route only, without executing anything.
    pub async fn route(&self, query: &str) -> RoutingDecision {
        self.router.route(query).await
    }

    /// Handle a request with no deadline and no external cancellation.
    pub async fn handle_request(&self, query: &str) -> Result<RequestOutcome, EngineError> {
        self.handle_request_with(query, RequestOptions::default()).await
    }

    /// Handle a request. Only configuration problems are errors; responder
    /// failures end up in the transcript.
    pub async fn handle_request_with(
        &self,
        query: &str,
        options: RequestOptions,
    ) -> Result<RequestOutcome, EngineError> {
        let guard = CallGuard::new(
            options.cancel,
            options.deadline.map(|d| Instant::now() + d),
        );

        let mut session = CollaborationSession::new(query);
        info!(session = %session.id(), "Request received");

        session.advance(SessionStatus::Routing)?;
        let decision = self.router.route_with(query, &guard).await;

        let checked = decision
            .validate(&self.registry)
            .and_then(|()| self.dispatcher.check(&decision));
        if let Err(e) = checked {
            session.advance(SessionStatus::Failed)?;
            warn!(session = %session.id(), error = %e, "Routing decision rejected");
            return Err(e);
        }

        session.set_decision(decision)?;
        session.advance(SessionStatus::Executing)?;
        self.dispatcher.execute(&mut session, &guard).await?;

        session.advance(SessionStatus::Synthesizing)?;
        let final_answer = synthesizer::synthesize(&session);
        session.complete(final_answer.clone())?;

        info!(
            session = %session.id(),
            messages = session.messages().len(),
            failed = session.messages().iter().filter(|m| !m.is_success()).count(),
            "Request completed"
        );

        Ok(RequestOutcome {
            final_answer,
            session,
        })
    }
}
