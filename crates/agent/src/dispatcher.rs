//! Dispatcher — executes a routing decision against the responders.
//!
//! - **Single**: the primary responder once, no context.
//! - **Sequential**: primary first, then each supporter in listed order,
//!   each seeing the transcript so far. Failures are recorded and the chain
//!   continues.
//! - **Parallel**: all participants concurrently (bounded), no context.
//!   Results land in slots indexed by decision position and are appended in
//!   that order once every call has finished.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use conclave_core::capability::{CapabilityDescriptor, CapabilityId};
use conclave_core::classifier::ExecutionMode;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::guard::{CallGuard, Interrupt};
use crate::registry::CapabilityRegistry;
use crate::responder::{Responder, ResponderError, ResponderOutput};
use crate::router::RoutingDecision;
use crate::session::{AgentMessage, CollaborationSession, Contribution};

/// A resolved participant: descriptor plus the responder serving it.
struct Participant<'a> {
    descriptor: &'a CapabilityDescriptor,
    responder: &'a Arc<dyn Responder>,
}

/// Drives responders for one decision at a time. Holds no per-request state.
pub struct Dispatcher {
    registry: Arc<CapabilityRegistry>,
    responders: HashMap<CapabilityId, Arc<dyn Responder>>,
    max_parallel: usize,
    call_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            registry,
            responders: HashMap::new(),
            max_parallel: 4,
            call_timeout: None,
        }
    }

    /// Upper bound on concurrent responder calls in parallel mode (min 1).
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Time limit for each responder call.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Register the responder for a capability. The capability must exist
    /// and must not already have a responder.
    pub fn register(&mut self, responder: Arc<dyn Responder>) -> Result<(), EngineError> {
        let id = responder.capability().clone();
        self.registry.resolve(id.as_str())?;
        if self.responders.contains_key(&id) {
            return Err(EngineError::configuration(format!(
                "capability '{id}' already has a responder"
            )));
        }
        self.responders.insert(id, responder);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_responder(mut self, responder: Arc<dyn Responder>) -> Result<Self, EngineError> {
        self.register(responder)?;
        Ok(self)
    }

    /// Every registered capability has a responder.
    pub fn ensure_complete(&self) -> Result<(), EngineError> {
        for descriptor in self.registry.all() {
            if !self.responders.contains_key(&descriptor.id) {
                return Err(EngineError::configuration(format!(
                    "no responder registered for capability '{}'",
                    descriptor.id
                )));
            }
        }
        Ok(())
    }

    /// Resolve every participant of a decision, in decision order.
    fn plan<'a>(&'a self, decision: &RoutingDecision) -> Result<Vec<Participant<'a>>, EngineError> {
        decision
            .participants()
            .map(|id| -> Result<Participant<'a>, EngineError> {
                let descriptor = self.registry.resolve(id.as_str())?;
                let responder = self.responders.get(id).ok_or_else(|| {
                    EngineError::configuration(format!("no responder registered for capability '{id}'"))
                })?;
                Ok(Participant {
                    descriptor,
                    responder,
                })
            })
            .collect()
    }

    /// Check a decision can be executed without running anything.
    pub fn check(&self, decision: &RoutingDecision) -> Result<(), EngineError> {
        self.plan(decision).map(|_| ())
    }

    /// Execute the session's decision, appending one message per
    /// participant. Only configuration problems are returned as errors.
    pub async fn execute(
        &self,
        session: &mut CollaborationSession,
        guard: &CallGuard,
    ) -> Result<(), EngineError> {
        let decision = session
            .decision()
            .cloned()
            .ok_or_else(|| EngineError::configuration("session has no routing decision"))?;
        let participants = self.plan(&decision)?;
        let query = session.query().to_string();

        info!(
            session = %session.id(),
            mode = %decision.mode,
            participants = participants.len(),
            "Dispatching"
        );

        match decision.mode {
            ExecutionMode::Single => {
                let p = &participants[0];
                let contribution = self.invoke(p, &query, &[], guard).await;
                session.append(p.descriptor.id.clone(), &p.descriptor.label, contribution)?;
            }
            ExecutionMode::Sequential => {
                for p in &participants {
                    let contribution = self.invoke(p, &query, session.messages(), guard).await;
                    session.append(p.descriptor.id.clone(), &p.descriptor.label, contribution)?;
                }
            }
            ExecutionMode::Parallel => {
                let mut slots: Vec<Option<Contribution>> = participants.iter().map(|_| None).collect();

                let mut completions = futures::stream::iter(participants.iter().enumerate().map(
                    |(slot, p)| {
                        let query = query.as_str();
                        async move { (slot, self.invoke(p, query, &[], guard).await) }
                    },
                ))
                .buffer_unordered(self.max_parallel);

                while let Some((slot, contribution)) = completions.next().await {
                    debug!(slot, capability = %participants[slot].descriptor.id, "Parallel responder finished");
                    slots[slot] = Some(contribution);
                }

                for (p, slot) in participants.iter().zip(slots) {
                    if let Some(contribution) = slot {
                        session.append(p.descriptor.id.clone(), &p.descriptor.label, contribution)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// One guarded responder call, folded into a transcript contribution.
    async fn invoke(
        &self,
        p: &Participant<'_>,
        query: &str,
        context: &[AgentMessage],
        guard: &CallGuard,
    ) -> Contribution {
        let id = &p.descriptor.id;
        debug!(capability = %id, context = context.len(), "Invoking responder");

        let result = match guard.run(self.call_timeout, p.responder.process(query, context)).await {
            Ok(result) => result,
            Err(Interrupt::Cancelled) => Err(ResponderError::Cancelled),
            Err(Interrupt::DeadlineExceeded) => Err(ResponderError::DeadlineExceeded),
            Err(Interrupt::TimedOut(limit)) => Err(ResponderError::Timeout(limit)),
        };

        match result {
            Ok(ResponderOutput {
                content,
                suggested_capability,
            }) => {
                let suggested_capability = suggested_capability
                    .filter(|s| s != id && self.registry.contains(s.as_str()));
                if let Some(suggested) = &suggested_capability {
                    info!(capability = %id, suggested = %suggested, "Responder suggested another capability");
                }
                Contribution::Answer {
                    content,
                    suggested_capability,
                }
            }
            Err(e) => {
                warn!(capability = %id, reason = ?e.reason(), error = %e, "Responder failed");
                Contribution::Failed(e.to_failure())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::DecisionSource;
    use crate::session::{FailureReason, MessageStatus, SessionStatus};
    use crate::test_helpers::*;
    use conclave_core::classifier::Confidence;
    use conclave_core::error::ProviderError;
    use tokio_util::sync::CancellationToken;

    fn decision(ids: &[&str], mode: ExecutionMode) -> RoutingDecision {
        RoutingDecision {
            primary: CapabilityId::new(ids[0]),
            supporting: ids[1..].iter().map(|s| CapabilityId::new(*s)).collect(),
            mode,
            confidence: Confidence::High,
            rationale: String::new(),
            source: DecisionSource::Classifier,
        }
    }

    fn executing(query: &str, decision: RoutingDecision) -> CollaborationSession {
        let mut session = CollaborationSession::new(query);
        session.advance(SessionStatus::Routing).unwrap();
        session.set_decision(decision).unwrap();
        session.advance(SessionStatus::Executing).unwrap();
        session
    }

    fn dispatcher(responders: Vec<Arc<ScriptedResponder>>) -> Dispatcher {
        let mut d = Dispatcher::new(Arc::new(test_registry()));
        for r in responders {
            d.register(r).unwrap();
        }
        d
    }

    fn contents(session: &CollaborationSession) -> Vec<&str> {
        session.messages().iter().map(|m| m.content.as_str()).collect()
    }

    #[tokio::test]
    async fn single_invokes_primary_once_without_context() {
        let db = Arc::new(ScriptedResponder::new("database").replying("42 pallets"));
        let d = dispatcher(vec![db.clone()]);
        let mut session = executing("capacity?", decision(&["database"], ExecutionMode::Single));

        d.execute(&mut session, &CallGuard::unbounded()).await.unwrap();

        assert_eq!(contents(&session), vec!["42 pallets"]);
        assert_eq!(db.calls(), 1);
        assert_eq!(db.contexts(), vec![Vec::<String>::new()]);
    }

    #[tokio::test]
    async fn sequential_passes_growing_transcript() {
        let db = Arc::new(ScriptedResponder::new("database").replying("SELECT * FROM oe_hdr"));
        let cs = Arc::new(ScriptedResponder::new("csharp").replying("var orders = ctx.Orders;"));
        let d = dispatcher(vec![db.clone(), cs.clone()]);
        let mut session = executing("q", decision(&["database", "csharp"], ExecutionMode::Sequential));

        d.execute(&mut session, &CallGuard::unbounded()).await.unwrap();

        assert_eq!(session.messages().len(), 2);
        assert_eq!(db.contexts(), vec![Vec::<String>::new()]);
        assert_eq!(cs.contexts(), vec![vec!["SELECT * FROM oe_hdr".to_string()]]);
        assert_eq!(session.messages()[1].ordinal, 1);
    }

    #[tokio::test]
    async fn sequential_failure_does_not_halt_chain() {
        let db = Arc::new(ScriptedResponder::new("database").failing(ProviderError::ApiError {
            status_code: 500,
            message: "boom".into(),
        }));
        let cs = Arc::new(ScriptedResponder::new("csharp"));
        let erp = Arc::new(ScriptedResponder::new("epicor"));
        let d = dispatcher(vec![db, cs.clone(), erp.clone()]);
        let mut session = executing(
            "q",
            decision(&["database", "csharp", "epicor"], ExecutionMode::Sequential),
        );

        d.execute(&mut session, &CallGuard::unbounded()).await.unwrap();

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].status, MessageStatus::Error);
        assert_eq!(messages[0].content, "Error: upstream service error (status 500)");
        assert_eq!(cs.contexts()[0], vec!["Error: upstream service error (status 500)".to_string()]);
        assert_eq!(erp.contexts()[0].len(), 2);
        assert!(messages[1].is_success() && messages[2].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_order_follows_decision_not_completion() {
        let slow = Arc::new(ScriptedResponder::new("database").with_delay(Duration::from_millis(300)));
        let mid = Arc::new(ScriptedResponder::new("csharp").with_delay(Duration::from_millis(200)));
        let fast = Arc::new(ScriptedResponder::new("epicor").with_delay(Duration::from_millis(10)));
        let d = dispatcher(vec![slow.clone(), mid.clone(), fast.clone()]);
        let mut session = executing(
            "q",
            decision(&["database", "csharp", "epicor"], ExecutionMode::Parallel),
        );

        let started = tokio::time::Instant::now();
        d.execute(&mut session, &CallGuard::unbounded()).await.unwrap();

        assert_eq!(
            contents(&session),
            vec!["answer from database", "answer from csharp", "answer from epicor"]
        );
        let ordinals: Vec<usize> = session.messages().iter().map(|m| m.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        // concurrent, not serial
        assert!(started.elapsed() < Duration::from_millis(400));
        for r in [slow, mid, fast] {
            assert_eq!(r.contexts(), vec![Vec::<String>::new()]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_respects_max_parallel() {
        let d = dispatcher(vec![
            Arc::new(ScriptedResponder::new("database").with_delay(Duration::from_millis(100))),
            Arc::new(ScriptedResponder::new("csharp").with_delay(Duration::from_millis(100))),
            Arc::new(ScriptedResponder::new("epicor").with_delay(Duration::from_millis(100))),
        ])
        .with_max_parallel(1);
        let mut session = executing(
            "q",
            decision(&["database", "csharp", "epicor"], ExecutionMode::Parallel),
        );

        let started = tokio::time::Instant::now();
        d.execute(&mut session, &CallGuard::unbounded()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(session.messages().len(), 3);
    }

    #[tokio::test]
    async fn parallel_failure_isolated() {
        let d = dispatcher(vec![
            Arc::new(ScriptedResponder::new("database")),
            Arc::new(ScriptedResponder::new("csharp").failing(ProviderError::Network("down".into()))),
            Arc::new(ScriptedResponder::new("epicor")),
        ]);
        let mut session = executing(
            "q",
            decision(&["database", "csharp", "epicor"], ExecutionMode::Parallel),
        );

        d.execute(&mut session, &CallGuard::unbounded()).await.unwrap();

        let statuses: Vec<MessageStatus> = session.messages().iter().map(|m| m.status).collect();
        assert_eq!(
            statuses,
            vec![MessageStatus::Success, MessageStatus::Error, MessageStatus::Success]
        );
        assert_eq!(session.status(), SessionStatus::Executing);
    }

    #[tokio::test(start_paused = true)]
    async fn call_timeout_recorded_as_timeout() {
        let d = dispatcher(vec![
            Arc::new(ScriptedResponder::new("database").with_delay(Duration::from_secs(120))),
        ])
        .with_call_timeout(Duration::from_secs(60));
        let mut session = executing("q", decision(&["database"], ExecutionMode::Single));

        d.execute(&mut session, &CallGuard::unbounded()).await.unwrap();

        let failure = session.messages()[0].failure.clone().unwrap();
        assert_eq!(failure.reason, FailureReason::Timeout);
        assert_eq!(failure.detail, "timed out after 60s");
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_marks_in_flight_responders() {
        let d = dispatcher(vec![
            Arc::new(ScriptedResponder::new("database").with_delay(Duration::from_secs(10))),
            Arc::new(ScriptedResponder::new("csharp").with_delay(Duration::from_secs(10))),
        ]);
        let mut session = executing("q", decision(&["database", "csharp"], ExecutionMode::Parallel));

        let token = CancellationToken::new();
        let guard = CallGuard::new(token.clone(), None);
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        d.execute(&mut session, &guard).await.unwrap();
        canceller.await.unwrap();

        assert_eq!(session.messages().len(), 2);
        for m in session.messages() {
            let failure = m.failure.as_ref().unwrap();
            assert_eq!(failure.reason, FailureReason::Cancelled);
            assert_eq!(failure.detail, "cancelled before completion");
        }
    }

    #[tokio::test]
    async fn suggestions_are_filtered_to_known_capabilities() {
        let d = dispatcher(vec![
            Arc::new(ScriptedResponder::new("database").with_suggestion("csharp")),
            Arc::new(ScriptedResponder::new("csharp").with_suggestion("cobol")),
        ]);
        let mut session = executing("q", decision(&["database", "csharp"], ExecutionMode::Sequential));

        d.execute(&mut session, &CallGuard::unbounded()).await.unwrap();

        assert_eq!(
            session.messages()[0].suggested_capability,
            Some(CapabilityId::new("csharp"))
        );
        assert!(session.messages()[1].suggested_capability.is_none());
        // advisory only: nothing was re-invoked
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn register_rejects_unknown_and_duplicate() {
        let mut d = Dispatcher::new(Arc::new(test_registry()));
        assert!(d.register(Arc::new(ScriptedResponder::new("cobol"))).is_err());
        d.register(Arc::new(ScriptedResponder::new("database"))).unwrap();
        assert!(d.register(Arc::new(ScriptedResponder::new("database"))).is_err());
        assert!(d.ensure_complete().is_err());
    }

    #[test]
    fn check_rejects_missing_responder() {
        let d = dispatcher(vec![Arc::new(ScriptedResponder::new("database"))]);
        assert!(d.check(&decision(&["database"], ExecutionMode::Single)).is_ok());
        let err = d
            .check(&decision(&["database", "csharp"], ExecutionMode::Parallel))
            .unwrap_err();
        assert!(err.to_string().contains("csharp"));
    }
}
