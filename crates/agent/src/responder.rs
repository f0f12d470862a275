//! Responder contract — one implementation per capability.
//!
//! A responder turns a query (plus, in sequential mode, the transcript so
//! far) into an answer. External failures come back as [`ResponderError`];
//! the dispatcher records them in the transcript instead of propagating.

use async_trait::async_trait;
use conclave_core::capability::CapabilityId;
use conclave_core::error::ProviderError;
use std::time::Duration;
use thiserror::Error;

use crate::session::{AgentMessage, Failure, FailureReason};

/// A responder's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponderOutput {
    pub content: String,
    /// Advisory: another capability that should weigh in
    pub suggested_capability: Option<CapabilityId>,
}

impl ResponderOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            suggested_capability: None,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ResponderError {
    #[error("text generation failed: {0}")]
    Service(#[from] ProviderError),

    #[error("responder timed out after {0:?}")]
    Timeout(Duration),

    #[error("responder cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,

    #[error("unusable responder output: {0}")]
    InvalidOutput(String),
}

impl ResponderError {
    pub fn reason(&self) -> FailureReason {
        match self {
            ResponderError::Service(ProviderError::Timeout(_)) => FailureReason::Timeout,
            ResponderError::Service(_) => FailureReason::ServiceError,
            ResponderError::Timeout(_) => FailureReason::Timeout,
            ResponderError::Cancelled | ResponderError::DeadlineExceeded => FailureReason::Cancelled,
            ResponderError::InvalidOutput(_) => FailureReason::InvalidOutput,
        }
    }

    /// A description safe to show to end users: no upstream bodies, URLs
    /// or credentials.
    pub fn sanitized(&self) -> String {
        match self {
            ResponderError::Service(err) => match err {
                ProviderError::ApiError { status_code, .. } => {
                    format!("upstream service error (status {status_code})")
                }
                ProviderError::RateLimited { .. } => "upstream service is rate limited".into(),
                ProviderError::AuthenticationFailed(_) => {
                    "upstream service rejected credentials".into()
                }
                ProviderError::ModelNotFound(_) => "configured model is not available".into(),
                ProviderError::NotConfigured(_) => "text generation is not configured".into(),
                ProviderError::Timeout(_) => "upstream service timed out".into(),
                ProviderError::Network(_) => "upstream service is unreachable".into(),
            },
            ResponderError::Timeout(limit) => format!("timed out after {limit:?}"),
            ResponderError::Cancelled => "cancelled before completion".into(),
            ResponderError::DeadlineExceeded => "deadline exceeded".into(),
            ResponderError::InvalidOutput(_) => "unusable output".into(),
        }
    }

    pub fn to_failure(&self) -> Failure {
        Failure {
            reason: self.reason(),
            detail: self.sanitized(),
        }
    }
}

/// The responder contract.
#[async_trait]
pub trait Responder: Send + Sync {
    /// The capability this responder serves.
    fn capability(&self) -> &CapabilityId;

    /// Answer `query`, building on `context` (empty outside sequential mode).
    async fn process(
        &self,
        query: &str,
        context: &[AgentMessage],
    ) -> Result<ResponderOutput, ResponderError>;
}
