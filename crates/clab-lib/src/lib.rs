//! Containerlab lab discovery library
//!
//! This crate provides the core functionality for:
//! - Finding topology files in a workspace
//! - Running and normalizing the containerlab inspect tool
//! - Reconciling both into one lab / container / interface tree
//! - TTL caching with background expiry
//! - Health checks and observability

pub mod cache;
pub mod discovery;
pub mod error;
pub mod health;
pub mod inspect;
pub mod models;
pub mod observability;
pub mod paths;
pub mod tree;

pub use discovery::{LabDiscovery, LabDiscoveryBuilder};
pub use error::{ExternalToolError, FinderError};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthReport, Readiness,
};
pub use models::*;
pub use observability::{DiscoveryMetrics, StructuredLogger};
pub use tree::{build_tree, NodeId, TreeChange, TreeNode};
