//! External inspect tool gateway
//!
//! This module wraps the containerlab CLI:
//! - Building the whole-lab and per-node inspect command lines
//! - Running them through a pluggable [`CommandRunner`]
//! - Classifying and normalizing the JSON the tool prints

mod classify;
mod normalize;

pub use classify::{
    classify, DetailedContainer, NetworkSettings, RawInspection, RecordSchema, SimpleContainer,
};
pub use normalize::{lab_name_from_container, normalize, short_name};

use crate::error::ExternalToolError;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default upper bound for a per-node interface inspection
pub const DEFAULT_INTERFACE_TIMEOUT: Duration = Duration::from_secs(10);

/// How to invoke the inspect tool
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Tool binary (default: containerlab)
    pub binary: String,
    /// Container runtime selector passed with `-r` (default: docker)
    pub runtime: String,
    /// Prefix invocations with `sudo`
    pub use_sudo: bool,
    /// Hard limit for a single interface inspection (default: 10 seconds)
    pub interface_timeout: Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary: "containerlab".to_string(),
            runtime: "docker".to_string(),
            use_sudo: false,
            interface_timeout: DEFAULT_INTERFACE_TIMEOUT,
        }
    }
}

/// A fully resolved command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolInvocation {
    fn new(config: &ToolConfig, args: Vec<String>) -> Self {
        if config.use_sudo {
            let mut full = Vec::with_capacity(args.len() + 1);
            full.push(config.binary.clone());
            full.extend(args);
            Self {
                program: "sudo".to_string(),
                args: full,
            }
        } else {
            Self {
                program: config.binary.clone(),
                args,
            }
        }
    }

    /// `<tool> inspect -r <runtime> --all --details --format json`
    pub fn inspect_all(config: &ToolConfig) -> Self {
        Self::new(
            config,
            vec![
                "inspect".to_string(),
                "-r".to_string(),
                config.runtime.clone(),
                "--all".to_string(),
                "--details".to_string(),
                "--format".to_string(),
                "json".to_string(),
            ],
        )
    }

    /// `<tool> inspect interfaces -t <topology> -f json -n <container>`
    pub fn inspect_interfaces(config: &ToolConfig, abs_lab_path: &str, container: &str) -> Self {
        Self::new(
            config,
            vec![
                "inspect".to_string(),
                "interfaces".to_string(),
                "-t".to_string(),
                abs_lab_path.to_string(),
                "-f".to_string(),
                "json".to_string(),
                "-n".to_string(),
                container.to_string(),
            ],
        )
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Trait for running external commands and capturing stdout
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion and return its stdout
    async fn run(&self, invocation: &ToolInvocation) -> Result<String, ExternalToolError>;
}

/// Runs commands as child processes of this one
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<String, ExternalToolError> {
        debug!(command = %invocation, "Running inspect tool");

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExternalToolError::Spawn {
                command: invocation.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExternalToolError::NonZeroExit {
                command: invocation.to_string(),
                code: output.status.code(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Result of a successful whole-lab inspection
#[derive(Debug, Clone, PartialEq)]
pub enum InspectionData {
    /// The tool ran and printed nothing: no labs are deployed
    NoData,
    /// Parsed and classified output
    Inspection(RawInspection),
}

/// One interface as printed by `inspect interfaces`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RawInterface {
    pub name: String,
    #[serde(default, rename = "type")]
    pub if_type: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub mtu: u32,
    #[serde(default)]
    pub ifindex: u32,
}

#[derive(Debug, Deserialize)]
struct RawNodeInterfaces {
    #[serde(default)]
    interfaces: Option<Vec<RawInterface>>,
}

/// Gateway to the inspect tool
pub struct InspectGateway {
    runner: std::sync::Arc<dyn CommandRunner>,
    config: ToolConfig,
}

impl InspectGateway {
    pub fn new(runner: std::sync::Arc<dyn CommandRunner>, config: ToolConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Inspect every lab known to the runtime
    pub async fn fetch_inspection_data(&self) -> Result<InspectionData, ExternalToolError> {
        let invocation = ToolInvocation::inspect_all(&self.config);
        let stdout = self.runner.run(&invocation).await?;

        if stdout.trim().is_empty() {
            debug!(command = %invocation, "Inspect tool returned no data");
            return Ok(InspectionData::NoData);
        }

        let value: serde_json::Value =
            serde_json::from_str(&stdout).map_err(|e| ExternalToolError::MalformedOutput {
                command: invocation.to_string(),
                reason: e.to_string(),
            })?;

        let raw = classify(value).map_err(|reason| ExternalToolError::MalformedOutput {
            command: invocation.to_string(),
            reason,
        })?;

        Ok(InspectionData::Inspection(raw))
    }

    /// Inspect the interfaces of one node, bounded by the configured timeout
    ///
    /// An output shape other than `[{ "interfaces": [...] }]` yields an empty
    /// list with a warning rather than an error.
    pub async fn fetch_interfaces(
        &self,
        abs_lab_path: &str,
        container_name: &str,
    ) -> Result<Vec<RawInterface>, ExternalToolError> {
        let invocation =
            ToolInvocation::inspect_interfaces(&self.config, abs_lab_path, container_name);
        let timeout = self.config.interface_timeout;

        let stdout = tokio::time::timeout(timeout, self.runner.run(&invocation))
            .await
            .map_err(|_| ExternalToolError::Timeout {
                command: invocation.to_string(),
                timeout,
            })??;

        let nodes: Vec<RawNodeInterfaces> =
            serde_json::from_str(&stdout).map_err(|e| ExternalToolError::MalformedOutput {
                command: invocation.to_string(),
                reason: e.to_string(),
            })?;

        match nodes.into_iter().next().and_then(|node| node.interfaces) {
            Some(interfaces) => Ok(interfaces),
            None => {
                warn!(
                    container = %container_name,
                    command = %invocation,
                    "Interface output has no interfaces array, treating as empty"
                );
                Ok(Vec::new())
            }
        }
    }
}
