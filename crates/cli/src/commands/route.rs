//! `conclave route` — Show the routing decision for a query.

use std::path::Path;
use anyhow::Context;
use conclave_agent::Engine;

pub async fn run(config: Option<&Path>, query: &str) -> anyhow::Result<()> {
    let config = super::load_config(config)?;
    let engine = Engine::from_config(&config).context("Failed to build engine")?;

    let decision = engine.route(query).await;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}
