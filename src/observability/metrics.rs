//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Count lifecycle transitions, registrations and start failures
//! - Record request outcomes and latency at the context entry point
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `context_lifecycle_transitions_total` (counter): by target state
//! - `context_registrations_total` (counter): by artifact kind
//! - `context_start_failures_total` (counter)
//! - `context_requests_total` (counter): by status
//! - `context_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels stay low-cardinality: no paths or route names

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::artifact::ArtifactKind;
use crate::lifecycle::LifecycleState;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_transition(to: LifecycleState) {
    metrics::counter!("context_lifecycle_transitions_total", "to" => to.as_str()).increment(1);
}

pub fn record_registration(kind: ArtifactKind) {
    metrics::counter!("context_registrations_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_start_failure() {
    metrics::counter!("context_start_failures_total").increment(1);
}

pub fn record_request(status: u16, started: Instant) {
    metrics::counter!("context_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("context_request_duration_seconds").record(started.elapsed().as_secs_f64());
}
