//! clabtree
//!
//! Browse the containerlab labs of a workspace from the terminal: deployed
//! labs reported by the runtime, merged with topology files that are not
//! deployed yet.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clab_lib::inspect::ToolConfig;
use clab_lib::LabDiscovery;
use clap::{Parser, Subcommand};
use commands::{interfaces, labs, tree};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Containerlab lab browser
#[derive(Parser)]
#[command(name = "clabtree")]
#[command(author, version, about = "Browse containerlab labs in a workspace", long_about = None)]
pub struct Cli {
    /// Workspace searched for topology files (default: current directory)
    #[arg(long, short, env = "CLAB_WORKSPACE", global = true)]
    pub workspace: Option<PathBuf>,

    /// Inspect tool binary
    #[arg(long, env = "CLAB_BINARY", global = true)]
    pub binary: Option<String>,

    /// Container runtime passed to the inspect tool
    #[arg(long, short, env = "CLAB_RUNTIME", global = true)]
    pub runtime: Option<String>,

    /// Run the inspect tool through sudo
    #[arg(long, global = true)]
    pub sudo: bool,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List labs, deployed ones first
    Labs {
        /// Only labs reported by the runtime; fails if the inspect tool fails
        #[arg(long)]
        deployed_only: bool,
    },

    /// Show the lab / container / interface tree
    Tree,

    /// List the containers of a deployed lab
    Containers {
        /// Topology path or lab name
        lab: String,
    },

    /// List the interfaces of a container
    Interfaces {
        /// Topology path or lab name
        lab: String,

        /// Container name, full or short
        container: String,
    },

    /// Keep the tree on screen and redraw it when labs change
    Watch,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn build_discovery(cli: &Cli, file: &config::Config) -> Result<LabDiscovery> {
    let defaults = ToolConfig::default();
    let tool = ToolConfig {
        binary: cli
            .binary
            .clone()
            .or_else(|| file.binary.clone())
            .unwrap_or(defaults.binary),
        runtime: cli
            .runtime
            .clone()
            .or_else(|| file.runtime.clone())
            .unwrap_or(defaults.runtime),
        use_sudo: cli.sudo || file.use_sudo.unwrap_or(false),
        interface_timeout: file
            .interface_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.interface_timeout),
    };

    let workspace = match cli.workspace.clone().or_else(|| file.workspace.clone()) {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to determine working directory")?,
    };

    let mut builder = LabDiscovery::builder()
        .tool_config(tool)
        .workspace_root(workspace);
    if let Some(ttl) = file.cache_ttl_secs {
        builder = builder.cache_ttl(Duration::from_secs(ttl));
    }
    builder.build()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file = config::Config::load()?;
    let format = cli
        .format
        .or_else(|| {
            file.default_format
                .as_deref()
                .and_then(output::OutputFormat::from_name)
        })
        .unwrap_or_default();

    let discovery = build_discovery(&cli, &file)?;

    // Execute command
    match &cli.command {
        Commands::Labs { deployed_only } => {
            if *deployed_only {
                labs::list_deployed_labs(&discovery, format).await?;
            } else {
                labs::list_labs(&discovery, format).await?;
            }
        }
        Commands::Tree => tree::show_tree(&discovery, format).await?,
        Commands::Containers { lab } => {
            interfaces::list_containers(&discovery, lab, format).await?;
        }
        Commands::Interfaces { lab, container } => {
            interfaces::list_interfaces(&discovery, lab, container, format).await?;
        }
        Commands::Watch => tree::watch_tree(&discovery, format).await?,
    }

    Ok(())
}
