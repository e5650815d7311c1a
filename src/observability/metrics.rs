//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_upstream_requests_total` (counter): upstream calls by method, status
//! - `relay_upstream_duration_seconds` (histogram): time to response headers
//! - `relay_stream_closed_total` (counter): streamed responses by end reason
//!
//! Recording is a no-op until a recorder is installed, so the request path
//! never depends on the exporter being enabled.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_upstream(method: &str, status: u16, elapsed: Duration) {
    ::metrics::counter!(
        "relay_upstream_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("relay_upstream_duration_seconds", "method" => method.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_stream_closed(reason: &'static str) {
    ::metrics::counter!("relay_stream_closed_total", "reason" => reason).increment(1);
}
