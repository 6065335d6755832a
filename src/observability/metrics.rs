//! Metrics collection and exposition.
//!
//! # Metrics
//! - `engine_requests_total` (counter): requests by route, status
//! - `engine_request_duration_seconds` (histogram): latency by route
//! - `engine_rate_limited_total` (counter): rejections by backend
//! - `engine_rate_limit_fallback_total` (counter): shared-store calls served locally
//! - `engine_items_total` (counter): per-image outcomes by mode

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape listener. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "engine_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("engine_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(backend: &'static str) {
    metrics::counter!("engine_rate_limited_total", "backend" => backend).increment(1);
}

pub fn record_rate_limit_fallback() {
    metrics::counter!("engine_rate_limit_fallback_total").increment(1);
}

pub fn record_item(outcome: &'static str, mode: &'static str) {
    metrics::counter!("engine_items_total", "outcome" => outcome, "mode" => mode).increment(1);
}
