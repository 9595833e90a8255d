//! HTTP API for the lab tree, health checks and Prometheus metrics

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clab_lib::{
    build_tree,
    health::{ComponentStatus, HealthRegistry},
    models::{InterfaceRecord, LabRecord},
    tree::{NodeId, TreeNode},
    LabDiscovery,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub discovery: Arc<LabDiscovery>,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry, discovery: Arc<LabDiscovery>) -> Self {
        Self {
            health_registry,
            discovery,
        }
    }
}

/// Error body returned by failing endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// 200 while every component runs, 503 once one has stopped
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.report().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Tree still served from the workspace
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Every lab, deployed ones first
async fn labs(State(state): State<Arc<AppState>>) -> Json<Vec<LabRecord>> {
    Json(state.discovery.discover_labs().await)
}

/// Deployed labs only; 502 when the inspect tool fails
async fn deployed_labs(State(state): State<Arc<AppState>>) -> Response {
    match state.discovery.discover_inspect_labs().await {
        Ok(labs) => {
            let labs: Vec<LabRecord> = labs.unwrap_or_default().into_values().collect();
            Json(labs).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Deployed lab listing failed");
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

/// Display nodes for the whole tree
async fn tree(State(state): State<Arc<AppState>>) -> Json<Vec<TreeNode>> {
    let labs = state.discovery.discover_labs().await;
    Json(build_tree(&labs))
}

#[derive(Debug, Deserialize)]
pub struct InterfacesQuery {
    pub lab_path: String,
    pub container: String,
    pub container_id: String,
    pub state: String,
}

/// Interfaces of one container
async fn interfaces(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InterfacesQuery>,
) -> Json<Vec<InterfaceRecord>> {
    Json(
        state
            .discovery
            .get_interfaces(
                &query.lab_path,
                &query.container,
                &query.container_id,
                &query.state,
            )
            .await,
    )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PendingResponse {
    pub pending: bool,
}

/// Whether cached data has expired since the last pass
async fn pending(State(state): State<Arc<AppState>>) -> Json<PendingResponse> {
    Json(PendingResponse {
        pending: state.discovery.has_pending_changes(),
    })
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub node: Option<NodeId>,
}

/// Invalidate caches (no node) or signal a subtree refresh
async fn refresh(
    State(state): State<Arc<AppState>>,
    request: Option<Json<RefreshRequest>>,
) -> StatusCode {
    let node = request.and_then(|Json(r)| r.node);
    state.discovery.refresh(node);
    StatusCode::ACCEPTED
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/labs", get(labs))
        .route("/labs/deployed", get(deployed_labs))
        .route("/tree", get(tree))
        .route("/interfaces", get(interfaces))
        .route("/pending", get(pending))
        .route("/refresh", post(refresh))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
