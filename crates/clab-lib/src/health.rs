//! Component health of the discovery service
//!
//! Each discovery stage reports here after it runs. A failing inspect tool or
//! topology search only degrades the service, because the tree is still
//! built from the other source. A stopped cache janitor makes it unhealthy:
//! nothing would expire any more and the served tree would go stale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Parts of the service that report health
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Whole-lab and per-node `inspect` calls
    InspectGateway,
    /// Search for topology files under the workspace root
    TopologyFinder,
    /// Background sweep of expired cache entries
    Janitor,
}

impl Component {
    pub const ALL: [Component; 3] = [
        Component::InspectGateway,
        Component::TopologyFinder,
        Component::Janitor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::InspectGateway => "inspect_gateway",
            Component::TopologyFinder => "topology_finder",
            Component::Janitor => "janitor",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered from best to worst, so the overall status is the maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            checked_at: Utc::now(),
        }
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: ComponentStatus,
    pub components: BTreeMap<Component, ComponentHealth>,
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct RegistryState {
    components: BTreeMap<Component, ComponentHealth>,
    first_pass_done: bool,
}

/// Shared, cloneable view of component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    /// Empty registry; components appear as they first report
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every component starting out healthy
    pub fn with_all_components() -> Self {
        let components = Component::ALL
            .into_iter()
            .map(|c| (c, ComponentHealth::new(ComponentStatus::Healthy, None)))
            .collect();
        Self {
            state: Arc::new(RwLock::new(RegistryState {
                components,
                first_pass_done: false,
            })),
        }
    }

    async fn set(&self, component: Component, status: ComponentStatus, message: Option<String>) {
        self.state
            .write()
            .await
            .components
            .insert(component, ComponentHealth::new(status, message));
    }

    pub async fn record_healthy(&self, component: Component) {
        self.set(component, ComponentStatus::Healthy, None).await;
    }

    pub async fn record_degraded(&self, component: Component, message: impl Into<String>) {
        self.set(component, ComponentStatus::Degraded, Some(message.into()))
            .await;
    }

    /// Healthy on success, degraded with the error message otherwise
    pub async fn record_outcome<T, E: fmt::Display>(
        &self,
        component: Component,
        outcome: &Result<T, E>,
    ) {
        match outcome {
            Ok(_) => self.record_healthy(component).await,
            Err(e) => self.record_degraded(component, e.to_string()).await,
        }
    }

    /// The component stopped running while the service is still up
    pub async fn mark_stopped(&self, component: Component, reason: impl Into<String>) {
        self.set(component, ComponentStatus::Unhealthy, Some(reason.into()))
            .await;
    }

    pub async fn mark_first_pass_done(&self) {
        self.state.write().await.first_pass_done = true;
    }

    pub async fn report(&self) -> HealthReport {
        let components = self.state.read().await.components.clone();
        let status = components
            .values()
            .map(|health| health.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        HealthReport { status, components }
    }

    /// Ready once the first discovery pass finished and nothing has stopped
    pub async fn readiness(&self) -> Readiness {
        let state = self.state.read().await;
        if !state.first_pass_done {
            return Readiness {
                ready: false,
                reason: Some("First discovery pass not yet complete".to_string()),
            };
        }

        let stopped = state
            .components
            .iter()
            .find(|(_, health)| health.status == ComponentStatus::Unhealthy);
        match stopped {
            Some((component, health)) => Readiness {
                ready: false,
                reason: Some(format!(
                    "{} unhealthy: {}",
                    component,
                    health.message.as_deref().unwrap_or("stopped")
                )),
            },
            None => Readiness {
                ready: true,
                reason: None,
            },
        }
    }
}
