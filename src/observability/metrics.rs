//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pool_resources_created_total` (counter): resources built by the factory, by address
//! - `pool_resources_closed_total` (counter): resources torn down, by address and reason
//! - `pool_idle_resources` (gauge): resources currently queued, by address
//! - `breaker_opened_total` (counter): closed → open transitions, by address
//! - `group_all_unavailable_total` (counter): selections that found no closed breaker
//!
//! # Design Decisions
//! - Low-overhead metric updates through the `metrics` facade
//! - Labels for address and close reason only

use std::net::SocketAddr;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Why a resource was torn down instead of being pooled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Idle,
    QueueFull,
    Forced,
    UnknownAddress,
    PoolClosed,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Idle => "idle",
            CloseReason::QueueFull => "queue_full",
            CloseReason::Forced => "forced",
            CloseReason::UnknownAddress => "unknown_address",
            CloseReason::PoolClosed => "pool_closed",
        }
    }
}

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics endpoint listening");
    Ok(())
}

pub fn record_resource_created(address: &str) {
    metrics::counter!("pool_resources_created_total", "address" => address.to_string()).increment(1);
}

pub fn record_resource_closed(address: &str, reason: CloseReason) {
    metrics::counter!(
        "pool_resources_closed_total",
        "address" => address.to_string(),
        "reason" => reason.as_str()
    )
    .increment(1);
}

pub fn record_idle_resources(address: &str, count: usize) {
    metrics::gauge!("pool_idle_resources", "address" => address.to_string()).set(count as f64);
}

pub fn record_breaker_opened(address: &str) {
    metrics::counter!("breaker_opened_total", "address" => address.to_string()).increment(1);
}

pub fn record_all_unavailable() {
    metrics::counter!("group_all_unavailable_total").increment(1);
}
