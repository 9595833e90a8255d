//! Observability infrastructure for lab discovery
//!
//! Provides:
//! - Prometheus metrics (discovery latency, lab/container gauges, cache and tool counters)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Cache store names used as metric labels
pub mod stores {
    pub const LOCAL: &str = "local";
    pub const INSPECT: &str = "inspect";
    pub const INTERFACES: &str = "interfaces";
}

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DiscoveryMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct DiscoveryMetricsInner {
    discovery_latency_seconds: Histogram,
    inspect_latency_seconds: Histogram,
    labs_deployed: IntGauge,
    labs_undeployed: IntGauge,
    containers_discovered: IntGauge,
    tool_errors: IntCounter,
    interface_failures: IntCounter,
    cache_evictions: IntCounter,
    cache_hits: IntCounterVec,
    cache_misses: IntCounterVec,
}

impl DiscoveryMetricsInner {
    fn new() -> Self {
        Self {
            discovery_latency_seconds: register_histogram!(
                "clab_discovery_latency_seconds",
                "Time spent building the full lab tree",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register discovery_latency_seconds"),

            inspect_latency_seconds: register_histogram!(
                "clab_inspect_latency_seconds",
                "Time spent running the whole-lab inspect command",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inspect_latency_seconds"),

            labs_deployed: register_int_gauge!(
                "clab_labs_deployed",
                "Number of deployed labs in the last discovery pass"
            )
            .expect("Failed to register labs_deployed"),

            labs_undeployed: register_int_gauge!(
                "clab_labs_undeployed",
                "Number of topology files without a deployment in the last discovery pass"
            )
            .expect("Failed to register labs_undeployed"),

            containers_discovered: register_int_gauge!(
                "clab_containers_discovered",
                "Number of lab containers in the last discovery pass"
            )
            .expect("Failed to register containers_discovered"),

            tool_errors: register_int_counter!(
                "clab_inspect_tool_errors_total",
                "Total number of failed whole-lab inspections"
            )
            .expect("Failed to register tool_errors"),

            interface_failures: register_int_counter!(
                "clab_interface_failures_total",
                "Total number of failed or timed out interface inspections"
            )
            .expect("Failed to register interface_failures"),

            cache_evictions: register_int_counter!(
                "clab_cache_evictions_total",
                "Total number of cache entries evicted by the janitor"
            )
            .expect("Failed to register cache_evictions"),

            cache_hits: register_int_counter_vec!(
                "clab_cache_hits_total",
                "Cache lookups answered from a valid entry",
                &["store"]
            )
            .expect("Failed to register cache_hits"),

            cache_misses: register_int_counter_vec!(
                "clab_cache_misses_total",
                "Cache lookups that required a fresh fetch",
                &["store"]
            )
            .expect("Failed to register cache_misses"),
        }
    }
}

/// Discovery metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct DiscoveryMetrics {
    _private: (),
}

impl Default for DiscoveryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DiscoveryMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DiscoveryMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_discovery_latency(&self, duration_secs: f64) {
        self.inner().discovery_latency_seconds.observe(duration_secs);
    }

    pub fn observe_inspect_latency(&self, duration_secs: f64) {
        self.inner().inspect_latency_seconds.observe(duration_secs);
    }

    /// Update lab and container gauges after a discovery pass
    pub fn set_lab_counts(&self, deployed: i64, undeployed: i64, containers: i64) {
        self.inner().labs_deployed.set(deployed);
        self.inner().labs_undeployed.set(undeployed);
        self.inner().containers_discovered.set(containers);
    }

    pub fn inc_tool_errors(&self) {
        self.inner().tool_errors.inc();
    }

    pub fn inc_interface_failures(&self) {
        self.inner().interface_failures.inc();
    }

    pub fn add_cache_evictions(&self, count: u64) {
        self.inner().cache_evictions.inc_by(count);
    }

    pub fn inc_cache_hit(&self, store: &str) {
        self.inner().cache_hits.with_label_values(&[store]).inc();
    }

    pub fn inc_cache_miss(&self, store: &str) {
        self.inner().cache_misses.with_label_values(&[store]).inc();
    }
}

/// Structured logger for discovery events
///
/// Provides consistent JSON-formatted logging for discovery passes,
/// tool failures, and service lifecycle.
#[derive(Clone)]
pub struct StructuredLogger {
    host: String,
}

impl StructuredLogger {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Log the outcome of a discovery pass
    pub fn log_discovery(
        &self,
        deployed: usize,
        undeployed: usize,
        containers: usize,
        elapsed_ms: u64,
    ) {
        info!(
            event = "labs_discovered",
            host = %self.host,
            deployed = deployed,
            undeployed = undeployed,
            containers = containers,
            elapsed_ms = elapsed_ms,
            "Lab discovery complete"
        );
    }

    /// Log a failed whole-lab inspection
    pub fn log_tool_failure(&self, command: &str, error: &str) {
        warn!(
            event = "inspect_failed",
            host = %self.host,
            command = %command,
            error = %error,
            "Inspect tool failed, showing workspace labs only"
        );
    }

    /// Log a failed interface inspection for one container
    pub fn log_interface_failure(&self, container: &str, error: &str, timed_out: bool) {
        warn!(
            event = "interfaces_failed",
            host = %self.host,
            container = %container,
            timed_out = timed_out,
            error = %error,
            "Interface inspection failed, rendering container without interfaces"
        );
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, runtime: &str) {
        info!(
            event = "service_started",
            host = %self.host,
            version = %version,
            runtime = %runtime,
            "Lab discovery service started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            host = %self.host,
            reason = %reason,
            "Lab discovery service shutting down"
        );
    }
}
