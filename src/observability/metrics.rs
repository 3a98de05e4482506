//! Metrics collection and exposition.
//!
//! # Metrics
//! - `soap_requests_total` (counter): requests by method and SOAP version
//! - `soap_outcomes_total` (counter): pipeline outcomes (stored, duplicate, ...)
//! - `soap_request_duration_seconds` (histogram): handler latency
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Prometheus exporter serves its own listener, apart from the SOAP port

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count an inbound SOAP request.
pub fn record_request(method: &'static str, soap_version: &'static str) {
    metrics::counter!(
        "soap_requests_total",
        "method" => method,
        "soap_version" => soap_version
    )
    .increment(1);
}

/// Count a pipeline outcome and the time spent producing it.
pub fn record_outcome(outcome: &'static str, start_time: Instant) {
    metrics::counter!("soap_outcomes_total", "outcome" => outcome).increment(1);
    metrics::histogram!("soap_request_duration_seconds", "outcome" => outcome)
        .record(start_time.elapsed().as_secs_f64());
}
