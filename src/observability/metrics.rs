//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_requests_total` (counter): requests by decision (allow, deny)
//! - `gate_decision_duration_seconds` (histogram): time spent deciding
//! - `gate_invalid_candidates_total` (counter): skipped addresses by reason
//! - `gate_config_reloads_total` (counter): reloads by result
//! - `gate_upstream_errors_total` (counter): failed forwards
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::security::AddressError;

/// Install the Prometheus recorder with its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one decision; `start` is taken before the candidates are resolved.
pub fn record_decision(denied: bool, start: Instant) {
    let label = if denied { "deny" } else { "allow" };
    counter!("gate_requests_total", "decision" => label).increment(1);
    histogram!("gate_decision_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_invalid_candidate(error: &AddressError) {
    let reason = match error {
        AddressError::EmptyAddress => "empty",
        _ => "invalid",
    };
    counter!("gate_invalid_candidates_total", "reason" => reason).increment(1);
}

pub fn record_config_reload(applied: bool) {
    let result = if applied { "applied" } else { "rejected" };
    counter!("gate_config_reloads_total", "result" => result).increment(1);
}

pub fn record_upstream_error() {
    counter!("gate_upstream_errors_total").increment(1);
}
