//! Text generation provider implementations for Conclave.
//!
//! All providers implement the `conclave_core::Provider` trait.
//! The router builds the configured backends.

pub mod anthropic;
pub mod fallback;
mod http;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use fallback::FallbackProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
