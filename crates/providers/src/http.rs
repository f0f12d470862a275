//! HTTP plumbing shared by the REST providers.

use conclave_core::error::ProviderError;
use std::time::Duration;
use tracing::warn;

/// Build a reqwest client with an overall request timeout.
pub(crate) fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Translate a transport failure into a provider error.
pub(crate) fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else {
        ProviderError::Network(err.to_string())
    }
}

/// Map non-200 responses onto the provider error taxonomy.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();

    match status {
        200 => Ok(response),
        429 => {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            Err(ProviderError::RateLimited { retry_after_secs })
        }
        401 | 403 => Err(ProviderError::AuthenticationFailed(format!(
            "{provider} rejected the API key"
        ))),
        404 => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::ModelNotFound(body))
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            warn!(provider, status, body = %body, "Provider returned error");
            Err(ProviderError::ApiError {
                status_code: status,
                message: body,
            })
        }
    }
}
