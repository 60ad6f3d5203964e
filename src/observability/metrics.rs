//! Metrics collection and exposition.
//!
//! # Metrics
//! - `library_deletion_signals_total` (counter): soft deletes signalled, by kind
//! - `library_pending_deletions` (gauge): signals waiting for a purge, by kind
//! - `library_purge_runs_total` (counter): purge attempts, by kind and outcome
//! - `library_purged_records_total` (counter): rows physically removed, by kind
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests and
//!   library users pay nothing
//! - Prometheus exporter serves its own HTTP listener

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::domain::RecordKind;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// A soft delete was signalled; `pending` is the count after the signal.
pub fn record_deletion_signal(kind: RecordKind, pending: u64) {
    counter!("library_deletion_signals_total", "kind" => kind.as_str()).increment(1);
    record_pending_deletions(kind, pending);
}

pub fn record_pending_deletions(kind: RecordKind, pending: u64) {
    gauge!("library_pending_deletions", "kind" => kind.as_str()).set(pending as f64);
}

/// One purge attempt finished with `outcome` ("success" or "failure").
pub fn record_purge(kind: RecordKind, outcome: &'static str, removed: u64) {
    counter!("library_purge_runs_total", "kind" => kind.as_str(), "outcome" => outcome)
        .increment(1);
    if removed > 0 {
        counter!("library_purged_records_total", "kind" => kind.as_str()).increment(removed);
    }
}
