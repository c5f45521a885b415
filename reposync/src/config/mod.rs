//! Configuration management for reposync.

pub mod paths;
pub mod settings;

pub use paths::config_file;
pub use settings::{CommitConfig, CredentialsConfig, RepositoryConfig, ReposyncConfig};

use std::path::Path;

use crate::error::{Result, SyncError};

/// Load configuration from the default config file.
///
/// If the config file doesn't exist, returns default configuration.
pub fn load_config() -> Result<ReposyncConfig> {
    let path = config_file()?;
    load_config_from(&path)
}

/// Load configuration from a specific path.
///
/// If the file doesn't exist, returns default configuration.
pub fn load_config_from(path: &Path) -> Result<ReposyncConfig> {
    if !path.exists() {
        return Ok(ReposyncConfig::default().with_env_overrides());
    }

    let contents = std::fs::read_to_string(path)?;
    let config: ReposyncConfig =
        toml::from_str(&contents).map_err(|e| SyncError::ConfigRead(e.to_string()))?;

    Ok(config.with_env_overrides())
}

/// Save configuration to the default config file.
pub fn save_config(config: &ReposyncConfig) -> Result<()> {
    let path = config_file()?;
    save_config_to(config, &path)
}

/// Save configuration to a specific path.
pub fn save_config_to(config: &ReposyncConfig, path: &Path) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let contents =
        toml::to_string_pretty(config).map_err(|e| SyncError::ConfigWrite(e.to_string()))?;
    std::fs::write(path, contents)?;

    Ok(())
}
