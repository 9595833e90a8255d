//! Agent configuration

use anyhow::{Context, Result};
use clab_lib::inspect::ToolConfig;
use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Host name reported in structured logs
    #[serde(default = "default_host")]
    pub host: String,

    /// API server port for labs, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory searched for topology files (default: current directory)
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,

    /// Inspect tool binary
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Container runtime passed to the inspect tool
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Prefix inspect invocations with sudo
    #[serde(default)]
    pub use_sudo: bool,

    /// Lifetime of cached discovery results in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Time between janitor sweeps in seconds
    #[serde(default = "default_janitor_interval")]
    pub janitor_interval_secs: u64,

    /// Upper bound for one interface inspection in seconds
    #[serde(default = "default_interface_timeout")]
    pub interface_timeout_secs: u64,

    /// Watch the workspace for topology files appearing or disappearing
    #[serde(default = "default_watch")]
    pub watch: bool,
}

fn default_host() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_binary() -> String {
    "containerlab".to_string()
}

fn default_runtime() -> String {
    "docker".to_string()
}

fn default_cache_ttl() -> u64 {
    30
}

fn default_janitor_interval() -> u64 {
    10
}

fn default_interface_timeout() -> u64 {
    10
}

fn default_watch() -> bool {
    true
}

impl AgentConfig {
    /// Load configuration from `CLAB_*` environment variables
    pub fn load() -> Result<Self> {
        Self::from_builder(
            config::Config::builder()
                .add_source(config::Environment::with_prefix("CLAB").try_parsing(true)),
        )
    }

    /// Deserialize from prepared sources; unset keys take their defaults
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        builder
            .build()
            .context("Failed to read agent configuration")?
            .try_deserialize()
            .context("Invalid agent configuration")
    }

    /// Workspace root, falling back to the working directory
    pub fn resolved_workspace_root(&self) -> Result<PathBuf> {
        match &self.workspace_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().context("Failed to determine working directory"),
        }
    }

    pub fn tool_config(&self) -> ToolConfig {
        ToolConfig {
            binary: self.binary.clone(),
            runtime: self.runtime.clone(),
            use_sudo: self.use_sudo,
            interface_timeout: Duration::from_secs(self.interface_timeout_secs),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs)
    }
}
