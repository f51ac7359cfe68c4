//! Prometheus export for the monitor.
//!
//! The client crate records through the `metrics` facade; this module only
//! installs the exporter and registers descriptions.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Start the Prometheus exporter on `port` and describe the channel metrics.
///
/// # Errors
///
/// Returns an error if the exporter cannot be installed.
pub fn start_metrics_server(port: u16) -> Result<SocketAddr> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to start metrics exporter on {addr}"))?;

    codestorm_client::metrics::describe_metrics();
    metrics::describe_gauge!(
        names::MANIFEST_ROUTES,
        "Routes accessible to the configured identity"
    );

    info!(%addr, "Metrics exporter listening");
    Ok(addr)
}

/// Metric names owned by the monitor.
pub mod names {
    pub const MANIFEST_ROUTES: &str = "codestorm_monitor_accessible_routes";
}

/// Record how many routes the manifest grants.
pub fn set_accessible_routes(count: usize) {
    metrics::gauge!(names::MANIFEST_ROUTES).set(count as f64);
}
