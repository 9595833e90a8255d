//! Lab discovery agent
//!
//! Serves the reconciled lab tree of one workspace over HTTP, together with
//! health probes and Prometheus metrics.

pub mod api;
pub mod config;
