//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_sessions_total` (counter): finished sessions by outcome
//! - `relay_session_duration_seconds` (histogram): session lifetime
//! - `relay_bytes_total` (counter): audio bytes delivered to callers
//! - `relay_active_sessions` (gauge): live sessions
//! - `relay_upstream_errors_total` (counter): upstream failures by phase
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::relay::RelayPhase;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a session reaching a terminal phase.
pub fn record_session(outcome: RelayPhase, duration: Duration, bytes: u64) {
    counter!("relay_sessions_total", "outcome" => outcome.as_str()).increment(1);
    histogram!("relay_session_duration_seconds").record(duration.as_secs_f64());
    counter!("relay_bytes_total").increment(bytes);
}

pub fn record_upstream_error(phase: RelayPhase) {
    counter!("relay_upstream_errors_total", "phase" => phase.as_str()).increment(1);
}

pub fn set_active_sessions(count: usize) {
    gauge!("relay_active_sessions").set(count as f64);
}
