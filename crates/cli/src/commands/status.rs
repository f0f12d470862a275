//! `conclave status` — Show the effective configuration.

use std::path::Path;

pub fn run(config: Option<&Path>) -> anyhow::Result<()> {
    let config_path = super::config_path(config);
    let config = super::load_config(Some(&config_path))?;

    println!("🏛️  Conclave Status");
    println!("==================");
    println!("  Config file:   {}", config_path.display());
    println!("  Provider:      {}", config.default_provider);
    println!("  Model:         {}", config.default_model);
    println!("  API key:       {}", if config.has_api_key() { "[REDACTED]" } else { "not set" });
    println!("  Temperature:   {}", config.default_temperature);
    println!(
        "  Classifier:    {} (timeout {}ms)",
        if config.router.use_classifier { "enabled" } else { "disabled" },
        config.router.classify_timeout_ms
    );
    println!("  Default agent: {}", config.router.default_capability);
    println!("  Max parallel:  {}", config.dispatch.max_parallel);
    println!("  Agent timeout: {}s", config.responder.timeout_secs);
    println!("  Knowledge:     {} ({})", config.knowledge.backend, config.knowledge_dir().display());
    println!("  Capabilities:  {}", config.capabilities.len());

    for (name, provider) in &config.providers {
        let key = if provider.api_key.is_some() { "key set" } else { "no key" };
        let url = provider.api_url.as_deref().unwrap_or("default url");
        println!("  providers.{name}: {url}, {key}");
    }

    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `conclave onboard` first");
    }

    Ok(())
}
