//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by route, status
//! - `edge_request_duration_seconds` (histogram): latency by route
//! - `edge_fetch_retries_total` (counter): retries by reason (status, transport)
//! - `edge_image_rejections_total` (counter): proxy rejections by reason
//! - `edge_rate_limited_total` (counter): requests refused by the rate limiter
//!
//! Without an installed recorder every call is a no-op, so library users and
//! tests pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    counter!("edge_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
    histogram!("edge_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_fetch_retry(reason: &'static str) {
    counter!("edge_fetch_retries_total", "reason" => reason).increment(1);
}

pub fn record_image_rejection(reason: &'static str) {
    counter!("edge_image_rejections_total", "reason" => reason).increment(1);
}

pub fn record_rate_limited() {
    counter!("edge_rate_limited_total").increment(1);
}
