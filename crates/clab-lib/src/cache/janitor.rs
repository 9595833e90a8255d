//! Periodic sweep of expired cache entries
//!
//! Discovery itself never depends on the janitor: every read checks the
//! TTL. The sweep only exists so a displayed tree becomes fresh again
//! without the user asking for it. One sweep yields at most one
//! [`TreeChange::Full`] notification, however many entries expired.

use super::{LabCaches, SweepReport};
use crate::health::{Component, HealthRegistry};
use crate::observability::DiscoveryMetrics;
use crate::tree::TreeChange;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Default time between sweeps (10 seconds)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Background task that evicts expired entries and signals a refresh
pub struct CacheJanitor {
    caches: Arc<LabCaches>,
    changes: broadcast::Sender<TreeChange>,
    interval: Duration,
    metrics: DiscoveryMetrics,
    health: Option<HealthRegistry>,
}

impl CacheJanitor {
    pub fn new(
        caches: Arc<LabCaches>,
        changes: broadcast::Sender<TreeChange>,
        interval: Duration,
    ) -> Self {
        Self {
            caches,
            changes,
            interval,
            metrics: DiscoveryMetrics::new(),
            health: None,
        }
    }

    /// Report a healthy janitor after every sweep
    pub fn with_health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    /// Sweep every store once and notify if anything expired
    pub fn sweep(&self) -> SweepReport {
        let report = self.caches.sweep_expired_at(Instant::now());

        if report.any_expired() {
            self.metrics.add_cache_evictions(report.total() as u64);
            debug!(
                local = report.local,
                inspect = report.inspect,
                interfaces = report.interfaces,
                "Expired cache entries evicted"
            );
            // No subscribers is fine: nobody is displaying the tree
            let _ = self.changes.send(TreeChange::Full);
        }

        report
    }

    /// Run until the shutdown signal fires
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting cache janitor"
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                    if let Some(health) = &self.health {
                        health.record_healthy(Component::Janitor).await;
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down cache janitor");
                    break;
                }
            }
        }
    }
}
