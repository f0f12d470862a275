pub mod ask;
pub mod capabilities;
pub mod knowledge;
pub mod onboard;
pub mod route;
pub mod status;

use std::path::{Path, PathBuf};
use anyhow::Context;
use conclave_config::AppConfig;

/// The config file in use: `--config` if given, the default path otherwise.
pub fn config_path(config: Option<&Path>) -> PathBuf {
    config.map(Path::to_path_buf).unwrap_or_else(AppConfig::config_path)
}

/// Load and validate the configuration, with environment overrides applied.
pub fn load_config(config: Option<&Path>) -> anyhow::Result<AppConfig> {
    let path = config_path(config);
    AppConfig::load_with_env(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
