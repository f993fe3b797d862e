//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Chain block heights observed at connect
//! - Events scanned per chain and kind
//! - Relay submissions and failures
//!
//! The relayer is a one-pass process, so instead of a scrape endpoint the
//! collected metrics are snapshotted into the log at the end of the pass.

use crate::chain::ChainRole;

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, CounterVec, Encoder, GaugeVec, TextEncoder,
};

lazy_static! {
    pub static ref CHAIN_BLOCK_HEIGHT: GaugeVec = register_gauge_vec!(
        "warden_chain_block_height",
        "Block height observed at session connect",
        &["role"]
    )
    .unwrap();

    pub static ref EVENTS_SCANNED: CounterVec = register_counter_vec!(
        "warden_events_scanned_total",
        "Domain events decoded from the scan window",
        &["role", "event"]
    )
    .unwrap();

    pub static ref RELAYS_SUBMITTED: CounterVec = register_counter_vec!(
        "warden_relays_submitted_total",
        "Outbound relay transactions accepted by the target chain",
        &["function"]
    )
    .unwrap();

    pub static ref RELAYS_FAILED: CounterVec = register_counter_vec!(
        "warden_relays_failed_total",
        "Outbound relay attempts that failed",
        &["function"]
    )
    .unwrap();
}

pub fn record_chain_height(role: ChainRole, height: u64) {
    CHAIN_BLOCK_HEIGHT
        .with_label_values(&[role.as_str()])
        .set(height as f64);
}

pub fn record_events_scanned(role: ChainRole, event: &str, count: u64) {
    EVENTS_SCANNED
        .with_label_values(&[role.as_str(), event])
        .inc_by(count as f64);
}

pub fn record_relay_submitted(function: &str) {
    RELAYS_SUBMITTED.with_label_values(&[function]).inc();
}

pub fn record_relay_failed(function: &str) {
    RELAYS_FAILED.with_label_values(&[function]).inc();
}

/// Render all registered metrics in the Prometheus text format.
pub fn snapshot() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
