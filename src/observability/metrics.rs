//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tls13_zone_connections_accepted_total` (counter): by negotiated protocol
//! - `tls13_zone_accept_errors_total` (counter): failed accept() calls
//! - `tls13_zone_requests_total` (counter): requests answered by the responder
//! - `tls13_zone_active_connections` (gauge): live connection tasks
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is only installed when an address is configured

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::net::connection::NegotiatedProtocol;

pub const CONNECTIONS_ACCEPTED: &str = "tls13_zone_connections_accepted_total";
pub const ACCEPT_ERRORS: &str = "tls13_zone_accept_errors_total";
pub const REQUESTS: &str = "tls13_zone_requests_total";
pub const ACTIVE_CONNECTIONS: &str = "tls13_zone_active_connections";

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection_accepted(protocol: NegotiatedProtocol) {
    metrics::counter!(CONNECTIONS_ACCEPTED, "protocol" => protocol.as_str()).increment(1);
}

pub fn record_accept_error() {
    metrics::counter!(ACCEPT_ERRORS).increment(1);
}

pub fn record_request() {
    metrics::counter!(REQUESTS).increment(1);
}

pub fn set_active_connections(active: u64) {
    metrics::gauge!(ACTIVE_CONNECTIONS).set(active as f64);
}
