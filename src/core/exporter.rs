// Prometheus exporter for the gateway metrics

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// Installs the global recorder and serves `/metrics` on `port`.
/// Must run inside the Tokio runtime.
pub fn init_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}
