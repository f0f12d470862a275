//! Provider router — builds the configured text generation backends.
//!
//! Handles provider creation from config and hands out either a single named
//! provider or a fallback chain headed by the default one. Secondaries in
//! the chain are asked for their own model (`[providers.<name>]
//! default_model`, else a well-known default for the backend).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use conclave_core::provider::Provider;
use tracing::warn;
use crate::anthropic::AnthropicProvider;
use crate::fallback::FallbackProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Registry of named providers with a default.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    models: HashMap<String, String>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider name.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            models: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Model to request from `name` when it stands in for the default provider.
    pub fn set_model(&mut self, name: impl Into<String>, model: impl Into<String>) {
        self.models.insert(name.into(), model.into());
    }

    /// The model `name` is asked for as a fallback, if one is known.
    pub fn model_for(&self, name: &str) -> Option<&str> {
        self.models
            .get(name)
            .map(String::as_str)
            .or_else(|| well_known_model(name))
    }

    /// Get the default provider.
    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// The default provider followed by every other registered provider
    /// (alphabetical), each bounded by `timeout`.
    ///
    /// With a single provider the chain is skipped and that provider is
    /// returned directly.
    pub fn chain(&self, timeout: Duration) -> Option<Arc<dyn Provider>> {
        let primary = self.default_provider()?;
        if self.providers.len() == 1 {
            return Some(primary);
        }

        let mut fallback = FallbackProvider::new("fallback").then(primary, timeout);
        for name in self.list() {
            if name == self.default_provider {
                continue;
            }
            let Some(provider) = self.get(name) else {
                continue;
            };
            fallback = match self.model_for(name) {
                Some(model) => fallback.then_with_model(provider, timeout, model),
                None => {
                    warn!(provider = name, "No model configured for fallback provider, it will receive the default model id");
                    fallback.then(provider, timeout)
                }
            };
        }
        Some(Arc::new(fallback))
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
pub fn build_from_config(config: &conclave_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        router.register(
            name.clone(),
            build_provider(name, &api_key, provider_config.api_url.as_deref()),
        );
        if let Some(model) = &provider_config.default_model {
            router.set_model(name.clone(), model.clone());
        }
    }

    // Ensure the default provider exists (even if not explicitly configured)
    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        router.register(
            config.default_provider.clone(),
            build_provider(&config.default_provider, &api_key, None),
        );
    }

    router
}

fn build_provider(name: &str, api_key: &str, api_url: Option<&str>) -> Arc<dyn Provider> {
    if name == "anthropic" {
        let mut p = AnthropicProvider::new(api_key);
        if let Some(url) = api_url {
            p = p.with_base_url(url);
        }
        Arc::new(p)
    } else {
        let base_url = api_url.map(str::to_string).unwrap_or_else(|| default_base_url(name));
        Arc::new(OpenAiCompatProvider::new(name, base_url, api_key))
    }
}

/// Model used for a well-known backend when none is configured.
fn well_known_model(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "anthropic" => Some("claude-sonnet-4-20250514"),
        "openai" => Some("gpt-4o-mini"),
        "ollama" => Some("llama3.1"),
        "deepseek" => Some("deepseek-chat"),
        _ => None,
    }
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
