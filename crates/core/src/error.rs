//! Error types for the Conclave domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each external collaborator has its own error enum; the engine-level
//! error lives in `conclave-agent`.

use thiserror::Error;

// --- Bounded context errors ---

/// Failures of the external text generation service.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of the external text classification service.
///
/// Every variant is recoverable: the router answers with its keyword
/// fallback instead of surfacing the error.
#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    #[error("Classification service unavailable: {0}")]
    Unavailable(String),

    #[error("Classification timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Malformed classification answer: {0}")]
    Malformed(String),

    #[error("Classification referenced unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Inconsistent classification: {0}")]
    InconsistentDecision(String),
}

impl From<ProviderError> for ClassifierError {
    fn from(err: ProviderError) -> Self {
        ClassifierError::Unavailable(err.to_string())
    }
}

/// Failures of the knowledge lookup collaborator.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),
}
