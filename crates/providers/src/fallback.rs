//! Provider fallback chain.
//!
//! Links are attempted in order, each bounded by its own timeout, and the
//! last failure is surfaced when none answers. The request's model id is
//! chosen for the default provider; a link may pin its own model so that a
//! secondary speaking a different API is not sent a foreign id.

use async_trait::async_trait;
use conclave_core::error::ProviderError;
use conclave_core::provider::{Provider, ProviderRequest, ProviderResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A provider that tries an ordered list of providers until one answers.
pub struct FallbackProvider {
    name: String,
    links: Vec<Link>,
}

struct Link {
    provider: Arc<dyn Provider>,
    timeout: Duration,
    /// Replaces `ProviderRequest::model` for this link
    model: Option<String>,
}

impl Link {
    fn request(&self, request: &ProviderRequest) -> ProviderRequest {
        let mut request = request.clone();
        if let Some(model) = &self.model {
            request.model.clone_from(model);
        }
        request
    }
}

impl FallbackProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            links: Vec::new(),
        }
    }

    /// Append a provider that receives the request unchanged.
    pub fn then(mut self, provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        self.links.push(Link {
            provider,
            timeout,
            model: None,
        });
        self
    }

    /// Append a provider that is asked for `model` instead of the
    /// requested one.
    pub fn then_with_model(
        mut self,
        provider: Arc<dyn Provider>,
        timeout: Duration,
        model: impl Into<String>,
    ) -> Self {
        self.links.push(Link {
            provider,
            timeout,
            model: Some(model.into()),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Provider names in attempt order.
    pub fn members(&self) -> Vec<&str> {
        self.links.iter().map(|l| l.provider.name()).collect()
    }
}

#[async_trait]
impl Provider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut last_error = ProviderError::NotConfigured(format!("{} has no providers", self.name));

        for (attempt, link) in self.links.iter().enumerate() {
            let provider = link.provider.name();
            let request = link.request(&request);
            debug!(provider, model = %request.model, attempt = attempt + 1, "Trying provider");

            last_error = match tokio::time::timeout(link.timeout, link.provider.complete(request)).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => {
                    warn!(provider, error = %e, "Provider failed, trying next");
                    e
                }
                Err(_) => {
                    warn!(provider, timeout_ms = link.timeout.as_millis() as u64, "Provider timed out, trying next");
                    ProviderError::Timeout(format!("{provider} did not answer within {:?}", link.timeout))
                }
            };
        }

        Err(last_error)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        for link in &self.links {
            if let Ok(true) = link.provider.health_check().await {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
