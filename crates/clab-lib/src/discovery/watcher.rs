//! Workspace watching for topology file changes
//!
//! Watches the workspace root via filesystem notifications. When a topology
//! file is created, removed or renamed, the local-labs cache is dropped and
//! a full tree refresh is signalled.

use crate::cache::LabCaches;
use crate::tree::TreeChange;
use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

const TOPOLOGY_SUFFIXES: [&str; 2] = [".clab.yml", ".clab.yaml"];

/// Watches a workspace for topology files appearing or disappearing
pub struct TopologyWatcher {
    root: PathBuf,
    caches: Arc<LabCaches>,
    changes: broadcast::Sender<TreeChange>,
}

impl TopologyWatcher {
    pub fn new(
        root: impl Into<PathBuf>,
        caches: Arc<LabCaches>,
        changes: broadcast::Sender<TreeChange>,
    ) -> Self {
        Self {
            root: root.into(),
            caches,
            changes,
        }
    }

    /// Start watching; must be called from within a tokio runtime
    /// Returns a handle that stops watching when dropped
    pub fn start(self) -> Result<WatcherHandle> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => warn!(error = %e, "Filesystem watcher error"),
            },
            notify::Config::default(),
        )
        .context("Failed to create filesystem watcher")?;

        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", self.root.display()))?;
        info!(path = %self.root.display(), "Watching workspace for topology changes");

        let caches = self.caches;
        let changes = self.changes;

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if is_topology_event(&event) {
                    debug!(paths = ?event.paths, "Topology files changed");
                    caches.local.clear();
                    let _ = changes.send(TreeChange::Full);
                }
            }
            debug!("Watcher channel closed");
        });

        Ok(WatcherHandle {
            _watcher: watcher,
            _task: handle,
        })
    }
}

/// Handle to a running watcher
/// Stops watching when dropped
pub struct WatcherHandle {
    _watcher: RecommendedWatcher,
    _task: tokio::task::JoinHandle<()>,
}

/// Whether an event changes the set of topology files
pub fn is_topology_event(event: &Event) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    );
    relevant_kind && event.paths.iter().any(|p| is_topology_file(p))
}

/// `*.clab.yml` or `*.clab.yaml` outside any `node_modules` directory
pub fn is_topology_file(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    let matches_suffix = TOPOLOGY_SUFFIXES.iter().any(|s| name.ends_with(s));
    matches_suffix && !path.components().any(|c| c.as_os_str() == "node_modules")
}
