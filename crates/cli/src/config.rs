//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration file, `~/.config/clabtree/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Workspace searched for topology files
    pub workspace: Option<PathBuf>,
    /// Inspect tool binary
    pub binary: Option<String>,
    /// Container runtime
    pub runtime: Option<String>,
    /// Prefix inspect invocations with sudo
    pub use_sudo: Option<bool>,
    /// Interface inspection timeout in seconds
    pub interface_timeout_secs: Option<u64>,
    /// Cache lifetime in seconds, used by `watch`
    pub cache_ttl_secs: Option<u64>,
    /// Default output format
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file is an empty configuration.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Get the configuration file path
    pub fn config_path() -> Option<PathBuf> {
        let home = dirs_next::home_dir()?;
        Some(home.join(".config").join("clabtree").join("config.json"))
    }
}
