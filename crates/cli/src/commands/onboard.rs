//! `conclave onboard` — First-time setup.

use std::path::Path;
use conclave_config::AppConfig;

pub fn run(config: Option<&Path>) -> anyhow::Result<()> {
    let config_path = super::config_path(config);

    println!("🏛️  Conclave — First-Time Setup");
    println!("==============================\n");

    if let Some(dir) = config_path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("✅ Created config directory: {}", dir.display());
        }
    }

    if config_path.exists() {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    let settings = AppConfig::load_from(&config_path)?;
    let kb = conclave_knowledge::file_backend_from_config(&settings)?;
    println!("✅ Knowledge base at: {}", kb.base_path().display());
    for collection in kb.collections() {
        println!("     {collection}/");
    }

    println!("\n📝 Next steps:");
    println!("   1. Set ANTHROPIC_API_KEY (or add api_key to {})", config_path.display());
    println!("   2. Drop markdown notes into the collection folders");
    println!("   3. Run: conclave ask \"How many open orders are in warehouse RDU?\"\n");

    Ok(())
}
