//! Engine-level errors.
//!
//! Only configuration problems abort a request. Classifier and responder
//! failures are absorbed into the routing fallback and the transcript.

use thiserror::Error;

use crate::session::SessionError;

/// Problems with the capability table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("capability registry is empty")]
    Empty,

    #[error("capability id must not be empty")]
    EmptyId,

    #[error("duplicate capability id '{0}'")]
    DuplicateId(String),

    #[error("unknown capability '{0}'")]
    NotFound(String),
}

/// Errors surfaced by [`Engine`](crate::engine::Engine).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl EngineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        EngineError::Configuration {
            message: message.into(),
        }
    }
}

impl From<RegistryError> for EngineError {
    fn from(err: RegistryError) -> Self {
        EngineError::configuration(err.to_string())
    }
}

impl From<conclave_config::ConfigError> for EngineError {
    fn from(err: conclave_config::ConfigError) -> Self {
        EngineError::configuration(err.to_string())
    }
}

impl From<conclave_core::KnowledgeError> for EngineError {
    fn from(err: conclave_core::KnowledgeError) -> Self {
        EngineError::configuration(format!("knowledge backend: {err}"))
    }
}
