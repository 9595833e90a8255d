//! Lab discovery and reconciliation
//!
//! Merges two independent sources into one lab tree:
//! - topology files found in the workspace (undeployed labs)
//! - containers reported by the inspect tool (deployed labs)
//!
//! Both go through TTL caches. Labs are keyed by normalized topology path;
//! a deployed lab always replaces a workspace file with the same path.

mod assembly;
mod local;
mod watcher;


pub use assembly::{
    build_container, build_deployed_lab, build_interfaces, container_tooltip, group_by_lab_path,
    merge_labs, sort_labs,
};
pub use local::{GlobFinder, TopologyFinder, IGNORE_PATTERN, TOPOLOGY_PATTERNS};
pub use watcher::{is_topology_event, is_topology_file, TopologyWatcher, WatcherHandle};

use crate::cache::{
    interface_cache_key, CacheJanitor, InterfaceSnapshot, LabCaches, DEFAULT_CACHE_TTL,
    DEFAULT_SWEEP_INTERVAL,
};
use crate::error::ExternalToolError;
use crate::health::{Component, HealthRegistry};
use crate::inspect::{
    normalize, CommandRunner, InspectGateway, InspectionData, ProcessRunner, ToolConfig,
};
use crate::models::{CanonicalContainer, InterfaceRecord, LabPath, LabRecord};
use crate::observability::{stores, DiscoveryMetrics, StructuredLogger};
use crate::paths::normalize_lab_path;
use crate::tree::{NodeId, TreeChange};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Capacity of the change notification channel
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// The discovery engine
pub struct LabDiscovery {
    gateway: InspectGateway,
    finder: Arc<dyn TopologyFinder>,
    workspace_root: Option<PathBuf>,
    caches: Arc<LabCaches>,
    changes: broadcast::Sender<TreeChange>,
    sweep_interval: Duration,
    health: Option<HealthRegistry>,
    metrics: DiscoveryMetrics,
    logger: StructuredLogger,
}

impl LabDiscovery {
    pub fn builder() -> LabDiscoveryBuilder {
        LabDiscoveryBuilder::new()
    }

    pub fn tool_config(&self) -> &ToolConfig {
        self.gateway.config()
    }

    pub fn workspace_root(&self) -> Option<&std::path::Path> {
        self.workspace_root.as_deref()
    }

    /// Build the full lab tree
    ///
    /// Never fails: a broken inspect tool degrades to workspace labs only,
    /// and an empty result is a single placeholder record.
    pub async fn discover_labs(&self) -> Vec<LabRecord> {
        let started = Instant::now();

        let (local, deployed) = tokio::join!(self.local_lab_paths(), self.discover_inspect_labs());

        if let Some(health) = &self.health {
            health
                .record_outcome(Component::InspectGateway, &deployed)
                .await;
        }
        let deployed = match deployed {
            Ok(labs) => labs.unwrap_or_default(),
            Err(e) => {
                self.metrics.inc_tool_errors();
                self.logger.log_tool_failure(e.command(), &e.to_string());
                BTreeMap::new()
            }
        };

        let labs = merge_labs(deployed, &local);

        let deployed_count = labs.iter().filter(|l| l.deployed).count();
        let undeployed_count = labs
            .iter()
            .filter(|l| !l.deployed && !l.is_placeholder())
            .count();
        let container_count: usize = labs.iter().map(|l| l.containers.len()).sum();

        let elapsed = started.elapsed();
        self.metrics.observe_discovery_latency(elapsed.as_secs_f64());
        self.metrics.set_lab_counts(
            deployed_count as i64,
            undeployed_count as i64,
            container_count as i64,
        );
        self.logger.log_discovery(
            deployed_count,
            undeployed_count,
            container_count,
            elapsed.as_millis() as u64,
        );

        labs
    }

    /// Deployed labs only, keyed by absolute topology path
    ///
    /// `None` when the inspect tool reports no containers at all.
    pub async fn discover_inspect_labs(
        &self,
    ) -> Result<Option<BTreeMap<String, LabRecord>>, ExternalToolError> {
        let containers = self.inspect_containers().await?;
        if containers.is_empty() {
            return Ok(None);
        }

        let mut labs = BTreeMap::new();
        for (key, members) in group_by_lab_path(&containers) {
            let mut records = Vec::with_capacity(members.len());
            for container in &members {
                // Interface inspection is addressed by topology file
                let interfaces = if container.lab_path.absolute.is_empty() {
                    debug!(container = %container.name, "No topology path, interfaces skipped");
                    Vec::new()
                } else {
                    self.get_interfaces(
                        &container.lab_path.absolute,
                        &container.name,
                        &container.container_id,
                        &container.state,
                    )
                    .await
                };
                records.push(build_container(container, interfaces));
            }

            let lab = build_deployed_lab(&key, &members, records);
            labs.insert(lab.lab_path.absolute.clone(), lab);
        }

        Ok(Some(labs))
    }

    /// Interfaces of one container, served from cache while still valid
    ///
    /// A cached listing is reused only within the TTL and only while the
    /// container remains in the state it was read in. Any failure, timeout
    /// included, evicts the cached entry and yields an empty list.
    pub async fn get_interfaces(
        &self,
        abs_lab_path: &str,
        container_name: &str,
        container_id: &str,
        container_state: &str,
    ) -> Vec<InterfaceRecord> {
        let key = interface_cache_key(abs_lab_path, container_name, container_id);

        if let Some(snapshot) = self.caches.interfaces.get(&key, container_state) {
            self.metrics.inc_cache_hit(stores::INTERFACES);
            return snapshot.interfaces;
        }
        self.metrics.inc_cache_miss(stores::INTERFACES);

        match self
            .gateway
            .fetch_interfaces(abs_lab_path, container_name)
            .await
        {
            Ok(raw) => {
                let interfaces = build_interfaces(container_name, container_id, raw);
                self.caches.interfaces.insert(
                    key,
                    InterfaceSnapshot {
                        state: container_state.to_string(),
                        interfaces: interfaces.clone(),
                    },
                );
                interfaces
            }
            Err(e) => {
                self.caches.interfaces.remove(&key);
                self.metrics.inc_interface_failures();
                self.logger
                    .log_interface_failure(container_name, &e.to_string(), e.is_timeout());
                Vec::new()
            }
        }
    }

    /// Invalidate and notify
    ///
    /// Without a node every cache is cleared and a full refresh is
    /// signalled. With a node only that subtree is signalled; caches are
    /// left alone.
    pub fn refresh(&self, node: Option<NodeId>) {
        let change = match node {
            None => {
                self.caches.clear_all();
                info!("Lab caches cleared, full refresh requested");
                TreeChange::Full
            }
            Some(node) => {
                debug!(node = ?node, "Scoped refresh requested");
                TreeChange::Node(node)
            }
        };
        let _ = self.changes.send(change);
    }

    /// Whether any cached entry has outlived its TTL; does not mutate
    pub fn has_pending_changes(&self) -> bool {
        self.caches.has_expired_at(Instant::now())
    }

    /// Subscribe to tree change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<TreeChange> {
        self.changes.subscribe()
    }

    /// Drop the cached list of workspace topology files
    pub fn invalidate_local_labs(&self) {
        self.caches.local.clear();
    }

    /// Start the cache janitor on the current runtime
    pub fn spawn_janitor(&self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let mut janitor = CacheJanitor::new(
            self.caches.clone(),
            self.changes.clone(),
            self.sweep_interval,
        );
        if let Some(health) = &self.health {
            janitor = janitor.with_health(health.clone());
        }
        tokio::spawn(janitor.run(shutdown))
    }

    /// Watch the workspace root for topology files appearing or vanishing
    ///
    /// Returns `None` when no workspace root is configured.
    pub fn watch_workspace(&self) -> Result<Option<WatcherHandle>> {
        let Some(root) = &self.workspace_root else {
            return Ok(None);
        };
        let handle =
            TopologyWatcher::new(root.clone(), self.caches.clone(), self.changes.clone()).start()?;
        Ok(Some(handle))
    }

    /// Topology files in the workspace, deduplicated by normalized path
    async fn local_lab_paths(&self) -> Arc<Vec<LabPath>> {
        if let Some(paths) = self.caches.local.get(&(), &()) {
            self.metrics.inc_cache_hit(stores::LOCAL);
            return paths;
        }
        self.metrics.inc_cache_miss(stores::LOCAL);

        let found = self.finder.find_topology_files().await;
        if let Some(health) = &self.health {
            health
                .record_outcome(Component::TopologyFinder, &found)
                .await;
        }
        let files = match found {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "Topology search failed, no workspace labs listed");
                return Arc::new(Vec::new());
            }
        };

        let root = self.workspace_root.as_deref();
        let mut seen = HashSet::new();
        let paths: Vec<LabPath> = files
            .iter()
            .map(|file| LabPath::resolve(&file.to_string_lossy(), root))
            .filter(|path| seen.insert(path.absolute.clone()))
            .collect();

        let paths = Arc::new(paths);
        self.caches.local.insert((), paths.clone());
        paths
    }

    /// Normalized whole-lab inspection, cached
    async fn inspect_containers(&self) -> Result<Arc<Vec<CanonicalContainer>>, ExternalToolError> {
        if let Some(containers) = self.caches.inspect.get(&(), &()) {
            self.metrics.inc_cache_hit(stores::INSPECT);
            return Ok(containers);
        }
        self.metrics.inc_cache_miss(stores::INSPECT);

        let started = Instant::now();
        let data = self.gateway.fetch_inspection_data().await?;
        self.metrics
            .observe_inspect_latency(started.elapsed().as_secs_f64());

        let containers = match data {
            InspectionData::NoData => Vec::new(),
            InspectionData::Inspection(raw) => {
                debug!(
                    schema = ?raw.schema(),
                    grouped = raw.is_grouped(),
                    containers = raw.container_count(),
                    "Classified inspect output"
                );
                normalize(&raw, self.workspace_root.as_deref())
            }
        };

        let containers = Arc::new(containers);
        self.caches.inspect.insert((), containers.clone());
        Ok(containers)
    }
}

fn absolute_root(root: PathBuf) -> Result<PathBuf> {
    if root.is_absolute() {
        return Ok(root);
    }
    let cwd = std::env::current_dir().context("Failed to resolve relative workspace root")?;
    let joined = cwd.join(&root);
    Ok(PathBuf::from(normalize_lab_path(&joined.to_string_lossy(), None)))
}

/// Builder for the discovery engine
pub struct LabDiscoveryBuilder {
    runner: Option<Arc<dyn CommandRunner>>,
    finder: Option<Arc<dyn TopologyFinder>>,
    tool: ToolConfig,
    workspace_root: Option<PathBuf>,
    cache_ttl: Duration,
    sweep_interval: Duration,
    health: Option<HealthRegistry>,
    host: String,
}

impl LabDiscoveryBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            runner: None,
            finder: None,
            tool: ToolConfig::default(),
            workspace_root: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            health: None,
            host: "localhost".to_string(),
        }
    }

    /// Set the command runner (default: child processes)
    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Set the topology finder (default: glob search under the workspace root)
    pub fn finder(mut self, finder: Arc<dyn TopologyFinder>) -> Self {
        self.finder = Some(finder);
        self
    }

    pub fn tool_config(mut self, tool: ToolConfig) -> Self {
        self.tool = tool;
        self
    }

    pub fn workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Report component health to this registry
    pub fn health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    /// Host name used in structured log events
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Build the discovery engine
    ///
    /// A relative workspace root is resolved against the current directory.
    pub fn build(self) -> Result<LabDiscovery> {
        let workspace_root = self.workspace_root.map(absolute_root).transpose()?;
        let finder: Arc<dyn TopologyFinder> = match (self.finder, &workspace_root) {
            (Some(finder), _) => finder,
            (None, Some(root)) => Arc::new(GlobFinder::new(root.clone())),
            (None, None) => {
                return Err(anyhow::anyhow!(
                    "A workspace root or a topology finder is required"
                ))
            }
        };
        let runner = self
            .runner
            .unwrap_or_else(|| Arc::new(ProcessRunner) as Arc<dyn CommandRunner>);

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Ok(LabDiscovery {
            gateway: InspectGateway::new(runner, self.tool),
            finder,
            workspace_root,
            caches: Arc::new(LabCaches::new(self.cache_ttl)),
            changes,
            sweep_interval: self.sweep_interval,
            health: self.health,
            metrics: DiscoveryMetrics::new(),
            logger: StructuredLogger::new(self.host),
        })
    }
}

impl Default for LabDiscoveryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
