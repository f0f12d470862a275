//! OpenAI-compatible chat completions.
//!
//! Covers OpenAI, OpenRouter, Ollama, vLLM, Groq, Together and anything else
//! that serves `POST {base}/chat/completions`.

use async_trait::async_trait;
use conclave_core::error::ProviderError;
use conclave_core::message::{Message, Role};
use conclave_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::http;

/// A provider speaking the OpenAI chat completions protocol.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// `api_key` may be empty for keyless local servers.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: http::client(Duration::from_secs(120)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.api_key)
        }
    }
}

// --- wire format ---

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn<'a>>,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
}

#[derive(Debug, Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn from_request(request: &'a ProviderRequest) -> Self {
        Self {
            model: &request.model,
            messages: request.messages.iter().map(ChatTurn::from_message).collect(),
            temperature: request.temperature,
            stream: false,
            max_tokens: request.max_tokens,
            stop: &request.stop,
        }
    }
}

impl<'a> ChatTurn<'a> {
    fn from_message(message: &'a Message) -> Self {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        Self {
            role,
            content: &message.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl ChatResponse {
    fn into_provider_response(self, requested_model: &str) -> Result<ProviderResponse, ProviderError> {
        let Some(choice) = self.choices.into_iter().next() else {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: "response contained no choices".into(),
            });
        };

        Ok(ProviderResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            usage: self.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: if self.model.is_empty() {
                requested_model.to_string()
            } else {
                self.model
            },
        })
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion"
        );

        let response = self
            .authorized(self.client.post(self.endpoint("chat/completions")))
            .json(&ChatRequest::from_request(&request))
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status(&self.name, response).await?;

        let parsed: ChatResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("unreadable completion body: {e}"),
        })?;
        parsed.into_provider_response(&request.model)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let response = self
            .authorized(self.client.get(self.endpoint("models")))
            .send()
            .await
            .map_err(http::transport_error)?;
        Ok(response.status().is_success())
    }
}
