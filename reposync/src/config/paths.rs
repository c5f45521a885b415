//! Platform-specific path utilities for reposync.

use std::path::PathBuf;

use crate::error::{Result, SyncError};

/// Get the configuration directory for reposync.
///
/// - Linux: `~/.config/reposync`
/// - macOS: `~/Library/Application Support/reposync`
/// - Windows: `%APPDATA%\reposync`
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| SyncError::Config("Cannot determine config directory".to_string()))?;
    Ok(base.join("reposync"))
}

/// Get the main configuration file path.
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}
