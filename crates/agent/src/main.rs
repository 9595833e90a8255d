//! Lab discovery agent
//!
//! Discovers containerlab labs in one workspace, keeps the caches fresh in
//! the background and serves the result over HTTP.

use anyhow::{Context, Result};
use clab_agent::{api, config};
use clab_lib::{
    health::{Component, HealthRegistry},
    observability::StructuredLogger,
    LabDiscovery,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting clab-agent");

    // Load configuration
    let config = config::AgentConfig::load()?;
    let workspace_root = config.resolved_workspace_root()?;
    info!(
        workspace = %workspace_root.display(),
        runtime = %config.runtime,
        "Agent configured"
    );

    // Initialize health registry
    let health_registry = HealthRegistry::with_all_components();

    // Initialize structured logger
    let logger = StructuredLogger::new(&config.host);
    logger.log_startup(AGENT_VERSION, &config.runtime);

    let discovery = Arc::new(
        LabDiscovery::builder()
            .tool_config(config.tool_config())
            .workspace_root(&workspace_root)
            .cache_ttl(config.cache_ttl())
            .sweep_interval(config.janitor_interval())
            .health(health_registry.clone())
            .host(&config.host)
            .build()
            .context("Failed to build lab discovery")?,
    );

    // Background cache expiry
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let mut janitor_handle = discovery.spawn_janitor(shutdown_rx);

    // Keep the watcher alive for the lifetime of the agent
    let _watcher = if config.watch {
        match discovery.watch_workspace() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Workspace watcher unavailable, relying on cache expiry");
                health_registry
                    .record_degraded(Component::TopologyFinder, e.to_string())
                    .await;
                None
            }
        }
    } else {
        None
    };

    // First pass warms the caches; the agent is ready once it completes
    discovery.discover_labs().await;
    health_registry.mark_first_pass_done().await;

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        discovery.clone(),
    ));

    // Start lab, health and metrics server
    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Keep serving if the janitor dies, but report it through /healthz
    let mut janitor_running = true;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for shutdown signal")?;
                logger.log_shutdown("SIGINT received");
                break;
            }
            result = &mut api_handle => {
                match result {
                    Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                    Ok(Err(e)) => return Err(e.context("API server failed")),
                    Err(e) => return Err(anyhow::Error::new(e).context("API server task panicked")),
                }
                break;
            }
            result = &mut janitor_handle, if janitor_running => {
                janitor_running = false;
                let reason = match result {
                    Ok(()) => "cache janitor exited".to_string(),
                    Err(e) => format!("cache janitor panicked: {}", e),
                };
                warn!(reason = %reason, "Cached labs will no longer expire");
                health_registry.mark_stopped(Component::Janitor, reason).await;
            }
        }
    }

    let _ = shutdown_tx.send(());
    if janitor_running {
        if let Err(e) = janitor_handle.await {
            warn!(error = %e, "Cache janitor did not stop cleanly");
        }
    }

    info!("Shutting down");
    Ok(())
}
