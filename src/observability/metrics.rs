//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_requests_total` (counter): requests by outcome
//! - `gatekeeper_rejections_total` (counter): rejections by reason
//! - `gatekeeper_request_duration_seconds` (histogram): pipeline latency
//! - `gatekeeper_rate_limit_identifiers` (gauge): tracked limiter windows
//! - `gatekeeper_token_failures_total` (counter): session/CSRF verification failures by reason

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::TokenError;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: &'static str, start: Instant) {
    counter!("gatekeeper_requests_total", "outcome" => outcome).increment(1);
    histogram!("gatekeeper_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rejection(reason: &'static str) {
    counter!("gatekeeper_rejections_total", "reason" => reason).increment(1);
}

pub fn record_rate_limit_identifiers(count: usize) {
    gauge!("gatekeeper_rate_limit_identifiers").set(count as f64);
}

pub fn record_token_failure(token: &'static str, error: &TokenError) {
    counter!(
        "gatekeeper_token_failures_total",
        "token" => token,
        "reason" => error.kind()
    )
    .increment(1);
}
