//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ingress_boundary_responses_total` (counter): 405/404/503 responses
//!   produced directly at the listener, by status
//! - `ingress_queue_depth` (gauge): admitted exchanges awaiting ingestion
//! - `ingress_outstanding_exchanges` (gauge): registered, not yet
//!   completed; a value that only grows indicates leaked connections
//! - `ingress_receipt_duration_seconds` (histogram): body-read-to-register
//!   latency per ingested exchange
//! - `ingress_completions_total` (counter): completions written, by status
//! - `ingress_body_read_failures_total` (counter): exchanges discarded
//!   during body read
//! - `ingress_expired_exchanges_total` (counter): exchanges reaped after
//!   the expiration window

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// A 405/404/503 produced directly at the listener boundary.
pub fn record_boundary_response(method: &str, status: u16) {
    counter!(
        "ingress_boundary_responses_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_queue_depth(depth: usize) {
    gauge!("ingress_queue_depth").set(depth as f64);
}

pub fn record_outstanding(count: usize) {
    gauge!("ingress_outstanding_exchanges").set(count as f64);
}

pub fn record_receipt(latency: Duration) {
    histogram!("ingress_receipt_duration_seconds").record(latency.as_secs_f64());
}

pub fn record_completion(status: u16) {
    counter!("ingress_completions_total", "status" => status.to_string()).increment(1);
}

pub fn record_body_read_failure() {
    counter!("ingress_body_read_failures_total").increment(1);
}

pub fn record_expired(count: usize) {
    counter!("ingress_expired_exchanges_total").increment(count as u64);
}
