//! Tree display and live watching

use anyhow::{Context, Result};
use clab_lib::tree::TreeChange;
use clab_lib::{build_tree, LabDiscovery};
use colored::Colorize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::output::{print_info, print_json, render_tree, OutputFormat};

/// Print the lab tree once
pub async fn show_tree(discovery: &LabDiscovery, format: OutputFormat) -> Result<()> {
    let labs = discovery.discover_labs().await;
    let nodes = build_tree(&labs);

    match format {
        OutputFormat::Json => print_json(&nodes)?,
        OutputFormat::Table => print!("{}", render_tree(&nodes)),
    }

    Ok(())
}

/// Reprint the tree whenever it changes, until interrupted
pub async fn watch_tree(discovery: &LabDiscovery, format: OutputFormat) -> Result<()> {
    let mut changes = discovery.subscribe();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let janitor = discovery.spawn_janitor(shutdown_rx);
    let _watcher = match discovery.watch_workspace() {
        Ok(handle) => handle,
        Err(e) => {
            warn!(error = %e, "Workspace watcher unavailable, relying on cache expiry");
            None
        }
    };

    show_tree(discovery, format).await?;
    if format == OutputFormat::Table {
        print_info("Watching for changes, press Ctrl-C to stop");
    }

    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Ok(TreeChange::Full) => {}
                Ok(TreeChange::Node(node)) => debug!(node = ?node, "Subtree changed"),
                // Missed notifications collapse into one redraw
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Change notifications lagged"),
                Err(RecvError::Closed) => break,
            },
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }

        if format == OutputFormat::Table {
            println!("\n{}", chrono::Local::now().format("%H:%M:%S").to_string().dimmed());
        }
        show_tree(discovery, format).await?;
    }

    let _ = shutdown_tx.send(());
    janitor.await.context("Cache janitor panicked")?;
    Ok(())
}
