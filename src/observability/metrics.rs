//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rule_mutations_total` (counter): mutations by rule kind and outcome
//!   (`committed`, `committed_unpersisted`, `rejected`, `refreshed`)
//! - `rule_persist_failures_total` (counter): failed durable writes by rule kind
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::rule::RuleKind;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, "Failed to install metrics exporter: {}", e),
    }
}

pub fn record_mutation(kind: RuleKind, outcome: &'static str) {
    metrics::counter!(
        "rule_mutations_total",
        "rule_kind" => kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_persist_failure(kind: RuleKind) {
    metrics::counter!("rule_persist_failures_total", "rule_kind" => kind.as_str()).increment(1);
}
