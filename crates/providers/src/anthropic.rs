//! Anthropic Messages API.
//!
//! Differences from the OpenAI protocol: the key goes in `x-api-key`, an
//! `anthropic-version` header is required, system prompts travel in a
//! top-level `system` field and `max_tokens` is mandatory.

use async_trait::async_trait;
use conclave_core::error::ProviderError;
use conclave_core::message::{Message, Role};
use conclave_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::http;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Provider for Anthropic's native API.
pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client: http::client(Duration::from_secs(300)),
        }
    }

    /// Point at a proxy or a test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

// --- wire format ---

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Turn<'a>>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop_sequences: &'a [String],
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> MessagesRequest<'a> {
    /// System messages are joined into the top-level field; the rest keep
    /// their order.
    fn from_request(request: &'a ProviderRequest) -> Self {
        let mut system = Vec::new();
        let mut messages = Vec::new();
        for message in &request.messages {
            match message.role {
                Role::System => system.push(message.content.as_str()),
                Role::User => messages.push(Turn {
                    role: "user",
                    content: &message.content,
                }),
                Role::Assistant => messages.push(Turn {
                    role: "assistant",
                    content: &message.content,
                }),
            }
        }

        Self {
            model: &request.model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages,
            stop_sequences: &request.stop,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
    usage: TokenUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TokenUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl From<MessagesResponse> for ProviderResponse {
    fn from(resp: MessagesResponse) -> Self {
        let text: Vec<&str> = resp
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect();

        ProviderResponse {
            message: Message::assistant(text.join("\n")),
            usage: Some(Usage {
                prompt_tokens: resp.usage.input_tokens,
                completion_tokens: resp.usage.output_tokens,
                total_tokens: resp.usage.input_tokens + resp.usage.output_tokens,
            }),
            model: resp.model,
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        debug!(provider = "anthropic", model = %request.model, "Sending messages request");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&MessagesRequest::from_request(&request))
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status(self.name(), response).await?;

        let parsed: MessagesResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("unreadable messages body: {e}"),
        })?;
        Ok(parsed.into())
    }
}
