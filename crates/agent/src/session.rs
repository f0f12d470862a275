//! Collaboration session — the per-request transcript and lifecycle.
//!
//! A session is owned by the request that created it. The dispatcher
//! appends messages, the engine drives the status forward, and callers get
//! read-only access plus serde for rendering or archiving.
//!
//! ```text
//! Created → Routing → Executing → Synthesizing → Completed
//!              └──────→ Failed
//! ```

use chrono::{DateTime, Utc};
use conclave_core::capability::CapabilityId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::router::RoutingDecision;

/// Overall session status. Transitions are strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Routing,
    Executing,
    Synthesizing,
    Completed,
    Failed,
}

impl SessionStatus {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Created, Routing)
                | (Routing, Executing)
                | (Routing, Failed)
                | (Executing, Synthesizing)
                | (Synthesizing, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SessionStatus::Created => "created",
            SessionStatus::Routing => "routing",
            SessionStatus::Executing => "executing",
            SessionStatus::Synthesizing => "synthesizing",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Success,
    Error,
}

/// Why a responder produced no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    ServiceError,
    Timeout,
    Cancelled,
    InvalidOutput,
}

/// Failure details safe to show to an end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub reason: FailureReason,
    pub detail: String,
}

/// One responder's contribution to the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Capability that produced this message
    pub capability: CapabilityId,

    /// Capability label at the time of the request
    pub label: String,

    /// Position in the transcript, starting at 0
    pub ordinal: usize,

    /// Answer text, or `Error: <detail>` for failures
    pub content: String,

    pub status: MessageStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,

    /// Advisory hint that another capability should contribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_capability: Option<CapabilityId>,

    pub timestamp: DateTime<Utc>,
}

impl AgentMessage {
    pub fn is_success(&self) -> bool {
        self.status == MessageStatus::Success
    }
}

/// What a responder invocation produced, before it has a transcript slot.
#[derive(Debug, Clone)]
pub(crate) enum Contribution {
    Answer {
        content: String,
        suggested_capability: Option<CapabilityId>,
    },
    Failed(Failure),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid session transition {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("routing decision can only be set once, while routing")]
    DecisionNotAccepted,

    #[error("messages can only be appended while executing (status: {0})")]
    NotExecuting(SessionStatus),
}

/// A single request's collaboration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationSession {
    id: Uuid,
    query: String,
    decision: Option<RoutingDecision>,
    messages: Vec<AgentMessage>,
    status: SessionStatus,
    final_answer: Option<String>,
    created_at: DateTime<Utc>,
}

impl CollaborationSession {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.into(),
            decision: None,
            messages: Vec::new(),
            status: SessionStatus::Created,
            final_answer: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn decision(&self) -> Option<&RoutingDecision> {
        self.decision.as_ref()
    }

    /// The transcript, in ordinal order.
    pub fn messages(&self) -> &[AgentMessage] {
        &self.messages
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.final_answer.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn advance(&mut self, next: SessionStatus) -> Result<(), SessionError> {
        if !self.status.can_advance_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        tracing::debug!(session = %self.id, from = %self.status, to = %next, "Session transition");
        self.status = next;
        Ok(())
    }

    pub(crate) fn set_decision(&mut self, decision: RoutingDecision) -> Result<(), SessionError> {
        if self.status != SessionStatus::Routing || self.decision.is_some() {
            return Err(SessionError::DecisionNotAccepted);
        }
        self.decision = Some(decision);
        Ok(())
    }

    /// Append one message. The ordinal is the current transcript length.
    pub(crate) fn append(
        &mut self,
        capability: CapabilityId,
        label: impl Into<String>,
        contribution: Contribution,
    ) -> Result<&AgentMessage, SessionError> {
        if self.status != SessionStatus::Executing {
            return Err(SessionError::NotExecuting(self.status));
        }

        let (content, status, failure, suggested_capability) = match contribution {
            Contribution::Answer {
                content,
                suggested_capability,
            } => (content, MessageStatus::Success, None, suggested_capability),
            Contribution::Failed(failure) => (
                format!("Error: {}", failure.detail),
                MessageStatus::Error,
                Some(failure),
                None,
            ),
        };

        self.messages.push(AgentMessage {
            capability,
            label: label.into(),
            ordinal: self.messages.len(),
            content,
            status,
            failure,
            suggested_capability,
            timestamp: Utc::now(),
        });
        Ok(&self.messages[self.messages.len() - 1])
    }

    /// Record the synthesized answer and finish.
    pub(crate) fn complete(&mut self, final_answer: String) -> Result<(), SessionError> {
        self.advance(SessionStatus::Completed)?;
        self.final_answer = Some(final_answer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str) -> Contribution {
        Contribution::Answer {
            content: text.into(),
            suggested_capability: None,
        }
    }

    fn executing() -> CollaborationSession {
        let mut session = CollaborationSession::new("q");
        session.advance(SessionStatus::Routing).unwrap();
        session.advance(SessionStatus::Executing).unwrap();
        session
    }

    #[test]
    fn forward_transitions_only() {
        let mut session = CollaborationSession::new("q");
        assert_eq!(session.status(), SessionStatus::Created);
        assert!(session.advance(SessionStatus::Executing).is_err());

        session.advance(SessionStatus::Routing).unwrap();
        session.advance(SessionStatus::Executing).unwrap();
        assert_eq!(
            session.advance(SessionStatus::Routing).unwrap_err(),
            SessionError::InvalidTransition {
                from: SessionStatus::Executing,
                to: SessionStatus::Routing,
            }
        );
        assert!(session.advance(SessionStatus::Failed).is_err());

        session.advance(SessionStatus::Synthesizing).unwrap();
        session.complete("done".into()).unwrap();
        assert!(session.status().is_terminal());
        assert_eq!(session.final_answer(), Some("done"));
        assert!(session.advance(SessionStatus::Completed).is_err());
    }

    #[test]
    fn failed_only_from_routing() {
        assert!(SessionStatus::Routing.can_advance_to(SessionStatus::Failed));
        assert!(!SessionStatus::Created.can_advance_to(SessionStatus::Failed));
        assert!(!SessionStatus::Synthesizing.can_advance_to(SessionStatus::Failed));
    }

    #[test]
    fn append_assigns_ordinals() {
        let mut session = executing();
        session.append("database".into(), "SQL Agent", answer("rows")).unwrap();
        session
            .append(
                "csharp".into(),
                "C# Agent",
                Contribution::Failed(Failure {
                    reason: FailureReason::Timeout,
                    detail: "timed out".into(),
                }),
            )
            .unwrap();

        let messages = session.messages();
        assert_eq!(messages[0].ordinal, 0);
        assert!(messages[0].is_success());
        assert_eq!(messages[1].ordinal, 1);
        assert_eq!(messages[1].status, MessageStatus::Error);
        assert_eq!(messages[1].content, "Error: timed out");
        assert_eq!(messages[1].failure.as_ref().unwrap().reason, FailureReason::Timeout);
    }

    #[test]
    fn append_outside_execution_rejected() {
        let mut session = CollaborationSession::new("q");
        let err = session.append("database".into(), "SQL", answer("x")).unwrap_err();
        assert_eq!(err, SessionError::NotExecuting(SessionStatus::Created));
    }

    #[test]
    fn session_serializes_transcript() {
        let mut session = executing();
        session.append("database".into(), "SQL Agent", answer("42 rows")).unwrap();

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["status"], "executing");
        assert_eq!(json["query"], "q");
        assert_eq!(json["messages"][0]["capability"], "database");
        assert_eq!(json["messages"][0]["status"], "success");
        assert!(json["messages"][0].get("failure").is_none());

        let back: CollaborationSession = serde_json::from_value(json).unwrap();
        assert_eq!(back.id(), session.id());
        assert_eq!(back.messages(), session.messages());
    }
}
