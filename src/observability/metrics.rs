//! Metrics collection and exposition.
//!
//! # Metrics
//! - `config_cache_hits_total` / `config_cache_misses_total` (counter)
//! - `config_remote_fetch_total` (counter): remote reads by outcome
//! - `config_fallback_total` (counter): fallback reads by source
//! - `config_circuit_transitions_total` (counter): by new state
//! - `config_cache_entries` (gauge): entries in the local cache
//! - `config_invalidations_total` (counter): by whether a key was removed
//! - `config_malformed_messages_total` (counter)
//! - `config_subscriber_reconnects_total` (counter): by error kind
//! - `config_publish_total` (counter): by result
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - Labels are static strings, never config keys

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_cache_hit() {
    counter!("config_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    counter!("config_cache_misses_total").increment(1);
}

pub fn record_remote_fetch(outcome: &'static str) {
    counter!("config_remote_fetch_total", "outcome" => outcome).increment(1);
}

pub fn record_fallback(source: &'static str) {
    counter!("config_fallback_total", "source" => source).increment(1);
}

pub fn record_circuit_transition(state: &'static str) {
    counter!("config_circuit_transitions_total", "state" => state).increment(1);
}

pub fn record_cache_size(size: usize) {
    gauge!("config_cache_entries").set(size as f64);
}

pub fn record_invalidation(removed: bool) {
    let removed = if removed { "true" } else { "false" };
    counter!("config_invalidations_total", "removed" => removed).increment(1);
}

pub fn record_malformed_message() {
    counter!("config_malformed_messages_total").increment(1);
}

pub fn record_subscriber_reconnect(kind: &'static str) {
    counter!("config_subscriber_reconnects_total", "kind" => kind).increment(1);
}

pub fn record_publish(result: &'static str) {
    counter!("config_publish_total", "result" => result).increment(1);
}
