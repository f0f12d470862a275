//! Configuration loading, validation, and management for Conclave.
//!
//! Loads configuration from `~/.conclave/config.toml` with environment
//! variable overrides. Validates all settings at startup: a bad capability
//! table is a configuration error, never something to limp along with.

use conclave_core::capability::{CapabilityDescriptor, Persona};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.conclave/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Router (classification + fallback) settings
    #[serde(default)]
    pub router: RouterConfig,

    /// Responder limits
    #[serde(default)]
    pub responder: ResponderConfig,

    /// Dispatcher settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Knowledge lookup backend
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// The capability registry, in declaration order
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<CapabilityConfig>,
}

fn default_provider() -> String {
    "anthropic".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("router", &self.router)
            .field("responder", &self.responder)
            .field("dispatch", &self.dispatch)
            .field("knowledge", &self.knowledge)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Model requested from this provider when it stands in for the
    /// default provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Ask the classification service first (falls back to keywords when off)
    #[serde(default = "default_true")]
    pub use_classifier: bool,

    /// Hard bound on one classification call
    #[serde(default = "default_classify_timeout_ms")]
    pub classify_timeout_ms: u64,

    /// Model override for classification (defaults to `default_model`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Capability chosen when no keyword matches
    #[serde(default = "default_capability")]
    pub default_capability: String,
}

fn default_classify_timeout_ms() -> u64 {
    8_000
}
fn default_capability() -> String {
    "general".into()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            use_classifier: true,
            classify_timeout_ms: default_classify_timeout_ms(),
            model: None,
            default_capability: default_capability(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// Maximum number of prior transcript messages forwarded to a responder
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,

    /// Per-invocation bound on the text generation call
    #[serde(default = "default_responder_timeout")]
    pub timeout_secs: u64,

    /// Maximum knowledge snippets injected per invocation
    #[serde(default = "default_max_snippets")]
    pub max_snippets: usize,

    /// Sampling temperature override (defaults to `default_temperature`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

fn default_max_context_messages() -> usize {
    5
}
fn default_responder_timeout() -> u64 {
    60
}
fn default_max_snippets() -> usize {
    3
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            max_context_messages: default_max_context_messages(),
            timeout_secs: default_responder_timeout(),
            max_snippets: default_max_snippets(),
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound on concurrently running responders in parallel mode
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

fn default_max_parallel() -> usize {
    4
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// "file", "memory", or "none"
    #[serde(default = "default_knowledge_backend")]
    pub backend: String,

    /// Root of the per-collection document folders (defaults to `~/.conclave/knowledge`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    /// Collection searched on behalf of every capability
    #[serde(default = "default_shared_collection")]
    pub shared_collection: String,
}

fn default_knowledge_backend() -> String {
    "file".into()
}
fn default_shared_collection() -> String {
    "shared".into()
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            backend: default_knowledge_backend(),
            base_path: None,
            shared_collection: default_shared_collection(),
        }
    }
}

/// One `[[capabilities]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityConfig {
    pub id: String,

    pub label: String,

    #[serde(default)]
    pub keywords: Vec<String>,

    /// Knowledge collection (defaults to the id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    pub persona: Persona,
}

impl CapabilityConfig {
    pub fn to_descriptor(&self) -> CapabilityDescriptor {
        let descriptor = CapabilityDescriptor::new(&self.id, &self.label, self.persona)
            .with_keywords(self.keywords.iter().cloned());
        match &self.collection {
            Some(collection) => descriptor.with_collection(collection),
            None => descriptor,
        }
    }
}

fn capability(id: &str, label: &str, persona: Persona, keywords: &[&str]) -> CapabilityConfig {
    CapabilityConfig {
        id: id.into(),
        label: label.into(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        collection: None,
        persona,
    }
}

/// The four specialists shipped out of the box.
fn default_capabilities() -> Vec<CapabilityConfig> {
    vec![
        capability(
            "database",
            "SQL Agent",
            Persona::Database,
            &[
                "sql", "database", "query", "table", "select", "join", "rows", "records",
                "how many", "count", "top", "total", "orders", "customers", "products",
                "revenue", "inventory", "warehouse", "capacity",
            ],
        ),
        capability(
            "csharp",
            "C# Agent",
            Persona::CSharp,
            &[
                "c#", "csharp", ".net", "asp.net", "linq", "entity framework", "ef core",
                "nuget", "class", "interface", "ienumerable", "iqueryable", "controller",
                "async", "code",
            ],
        ),
        capability(
            "epicor",
            "Epicor P21 Agent",
            Persona::Erp,
            &[
                "epicor", "p21", "prophet 21", "erp", "sales order", "purchase order",
                "item master", "pricing", "business rule", "dynachange",
            ],
        ),
        capability("general", "General Assistant", Persona::General, &[]),
    ]
}

impl AppConfig {
    /// Load configuration from the default path (~/.conclave/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `CONCLAVE_API_KEY` (highest priority)
    /// - `ANTHROPIC_API_KEY`
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_path())
    }

    /// Load from `path`, then apply the environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = ["CONCLAVE_API_KEY", "ANTHROPIC_API_KEY", "OPENROUTER_API_KEY", "OPENAI_API_KEY"]
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()));
        }

        if let Ok(provider) = std::env::var("CONCLAVE_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("CONCLAVE_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".conclave")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Resolved root of the knowledge collections.
    pub fn knowledge_dir(&self) -> PathBuf {
        match &self.knowledge.base_path {
            Some(path) => PathBuf::from(path),
            None => Self::config_dir().join("knowledge"),
        }
    }

    /// Capability descriptors in declaration order.
    pub fn capability_descriptors(&self) -> Vec<CapabilityDescriptor> {
        self.capabilities.iter().map(CapabilityConfig::to_descriptor).collect()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if let Some(t) = self.responder.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "responder.temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if self.capabilities.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one capability must be configured".into(),
            ));
        }

        let mut seen = HashSet::new();
        for cap in &self.capabilities {
            if cap.id.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "capability ids must not be empty".into(),
                ));
            }
            if !seen.insert(cap.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate capability id '{}'",
                    cap.id
                )));
            }
        }

        if !seen.contains(self.router.default_capability.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "router.default_capability '{}' is not a configured capability",
                self.router.default_capability
            )));
        }

        if self.dispatch.max_parallel == 0 {
            return Err(ConfigError::ValidationError(
                "dispatch.max_parallel must be at least 1".into(),
            ));
        }

        if self.responder.max_context_messages == 0 {
            return Err(ConfigError::ValidationError(
                "responder.max_context_messages must be at least 1".into(),
            ));
        }

        if self.router.classify_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "router.classify_timeout_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if the default provider has an API key, either top-level
    /// (config or environment) or in its `[providers.<name>]` table.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.as_deref().is_some_and(|k| !k.is_empty()))
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            providers: HashMap::new(),
            router: RouterConfig::default(),
            responder: ResponderConfig::default(),
            dispatch: DispatchConfig::default(),
            knowledge: KnowledgeConfig::default(),
            capabilities: default_capabilities(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
