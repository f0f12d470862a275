//! Shared test doubles for the engine tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use conclave_core::capability::{CapabilityDescriptor, CapabilityId, Persona};
use conclave_core::classifier::{Classifier, ClassifierVerdict};
use conclave_core::error::{ClassifierError, ProviderError};
use conclave_core::message::Message;
use conclave_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

use crate::registry::CapabilityRegistry;
use crate::responder::{Responder, ResponderError, ResponderOutput};
use crate::session::AgentMessage;

/// database / csharp / epicor / general, in that order.
pub fn test_registry() -> CapabilityRegistry {
    CapabilityRegistry::new(vec![
        CapabilityDescriptor::new("database", "SQL Agent", Persona::Database)
            .with_keywords(["sql", "database", "orders", "how many", "warehouse", "capacity"]),
        CapabilityDescriptor::new("csharp", "C# Agent", Persona::CSharp)
            .with_keywords(["c#", "linq", ".net", "iqueryable"]),
        CapabilityDescriptor::new("epicor", "Epicor P21 Agent", Persona::Erp)
            .with_keywords(["epicor", "p21", "erp", "pricing"]),
        CapabilityDescriptor::new("general", "General Assistant", Persona::General),
    ])
    .unwrap()
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A provider that returns one fixed outcome and records every request.
pub struct RecordingProvider {
    outcome: Result<String, ProviderError>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl RecordingProvider {
    pub fn replying(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            outcome: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "recording_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.outcome.as_deref().map(make_text_response).map_err(|e| e.clone())
    }
}

/// A classifier with a scripted answer and optional delay.
pub struct ScriptedClassifier {
    outcome: Result<ClassifierVerdict, ClassifierError>,
    delay: Option<Duration>,
    calls: Mutex<usize>,
    seen: Mutex<usize>,
}

impl ScriptedClassifier {
    pub fn answering(verdict: ClassifierVerdict) -> Self {
        Self {
            outcome: Ok(verdict),
            delay: None,
            calls: Mutex::new(0),
            seen: Mutex::new(0),
        }
    }

    pub fn failing(error: ClassifierError) -> Self {
        Self {
            outcome: Err(error),
            delay: None,
            calls: Mutex::new(0),
            seen: Mutex::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    /// Number of capabilities passed on the last call.
    pub fn seen_capabilities(&self) -> usize {
        *self.seen.lock().unwrap()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn classify(
        &self,
        _query: &str,
        capabilities: &[CapabilityDescriptor],
    ) -> Result<ClassifierVerdict, ClassifierError> {
        *self.calls.lock().unwrap() += 1;
        *self.seen.lock().unwrap() = capabilities.len();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

/// A responder with a scripted outcome that records the context it saw.
///
/// Answers `answer from <id>` unless told otherwise.
pub struct ScriptedResponder {
    capability: CapabilityId,
    outcome: Result<String, ProviderError>,
    suggestion: Option<CapabilityId>,
    delay: Option<Duration>,
    contexts: Mutex<Vec<Vec<String>>>,
}

impl ScriptedResponder {
    pub fn new(id: &str) -> Self {
        Self {
            capability: CapabilityId::new(id),
            outcome: Ok(format!("answer from {id}")),
            suggestion: None,
            delay: None,
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(mut self, text: &str) -> Self {
        self.outcome = Ok(text.to_string());
        self
    }

    pub fn failing(mut self, error: ProviderError) -> Self {
        self.outcome = Err(error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_suggestion(mut self, id: &str) -> Self {
        self.suggestion = Some(CapabilityId::new(id));
        self
    }

    pub fn calls(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }

    /// Content of the context messages seen, one entry per call.
    pub fn contexts(&self) -> Vec<Vec<String>> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    fn capability(&self) -> &CapabilityId {
        &self.capability
    }

    async fn process(
        &self,
        _query: &str,
        context: &[AgentMessage],
    ) -> Result<ResponderOutput, ResponderError> {
        self.contexts
            .lock()
            .unwrap()
            .push(context.iter().map(|m| m.content.clone()).collect());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.outcome {
            Ok(text) => Ok(ResponderOutput {
                content: text.clone(),
                suggested_capability: self.suggestion.clone(),
            }),
            Err(e) => Err(ResponderError::Service(e.clone())),
        }
    }
}

/// Every capability in [`test_registry`] served by a default scripted responder.
pub fn scripted_responders() -> Vec<Arc<ScriptedResponder>> {
    test_registry()
        .all()
        .iter()
        .map(|d| Arc::new(ScriptedResponder::new(d.id.as_str())))
        .collect()
}
