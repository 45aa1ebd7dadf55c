use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Creates a default configuration file with example content at the default location,
/// and the base currency directory under the default data root
pub fn setup() -> Result<()> {
    let path = AppConfig::default_config_path()?;
    let data_root = AppConfig::default_data_root()?;
    setup_at_path(path, data_root)
}

/// Creates a default configuration file at `path` and prepares `data_root`
/// with the example config's base currency directory
pub fn setup_at_path<P: AsRef<Path>, D: AsRef<Path>>(path: P, data_root: D) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    // Include the example config as a string literal in the binary
    let default_config = include_str!("../../docs/example_config.yaml");

    std::fs::write(path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;
    tracing::info!("Created default configuration at {}", path.display());

    let example: AppConfig =
        serde_yaml::from_str(default_config).context("Failed to parse example config")?;
    let base_dir = data_root.as_ref().join(&example.api.base_currency);
    std::fs::create_dir_all(&base_dir)
        .with_context(|| format!("Failed to create directory: {}", base_dir.display()))?;
    tracing::info!("Prepared data directory at {}", base_dir.display());

    Ok(())
}
