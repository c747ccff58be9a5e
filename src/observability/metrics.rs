//! Metrics collection and exposition.
//!
//! # Metrics
//! - `webapp_lifecycle_events_total` (counter): application starts/stops by `event`
//! - `webapp_requests_rejected_total` (counter): rejected requests by `reason`
//! - `webapp_mail_sent_total` (counter): messages handed to the mail transport

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
/// Must be called inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_lifecycle_event(event: &'static str) {
    metrics::counter!("webapp_lifecycle_events_total", "event" => event).increment(1);
}

pub fn record_request_rejected(reason: &'static str) {
    metrics::counter!("webapp_requests_rejected_total", "reason" => reason).increment(1);
}

pub fn record_mail_sent() {
    metrics::counter!("webapp_mail_sent_total").increment(1);
}
