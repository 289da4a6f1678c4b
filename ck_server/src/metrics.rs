//! Prometheus metrics for monitoring queue, match and connection health.
//!
//! Metrics are exposed in Prometheus text format on a separate listener,
//! installed only when `METRICS_BIND` is configured. Without an installed
//! recorder every call here is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ck_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::queue_joins_total(5, "1v1");
//! metrics::websocket_connections_total();
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// Queue Metrics
// ============================================================================

pub fn queue_joins_total(stake: u32, mode: &str) {
    metrics::counter!("queue_joins_total",
        "stake" => stake.to_string(),
        "mode" => mode.to_string()
    )
    .increment(1);
}

pub fn queue_cancels_total(stake: u32, mode: &str) {
    metrics::counter!("queue_cancels_total",
        "stake" => stake.to_string(),
        "mode" => mode.to_string()
    )
    .increment(1);
}

// ============================================================================
// Match Metrics
// ============================================================================

/// Record a move attempt by kind (`play`, `capture`, `chkobba`).
pub fn moves_total(kind: &str, accepted: bool) {
    metrics::counter!("moves_total",
        "kind" => kind.to_string(),
        "accepted" => accepted.to_string()
    )
    .increment(1);
}

/// Record a match seated for a queued player.
pub fn matches_formed_total(has_fallback: bool) {
    metrics::counter!("matches_formed_total",
        "has_fallback" => has_fallback.to_string()
    )
    .increment(1);
}

/// Set current live match count.
pub fn active_matches(count: usize) {
    metrics::gauge!("active_matches").set(count as f64);
}

pub fn matches_completed_total(settled: bool) {
    metrics::counter!("matches_completed_total",
        "settled" => settled.to_string()
    )
    .increment(1);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Increment total WebSocket connections counter.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Increment WebSocket messages sent counter.
pub fn websocket_messages_sent() {
    metrics::counter!("websocket_messages_sent").increment(1);
}

/// Increment WebSocket messages received counter.
pub fn websocket_messages_received() {
    metrics::counter!("websocket_messages_received").increment(1);
}

/// Increment rate limit hits counter.
pub fn rate_limit_hits_total(endpoint: &str) {
    metrics::counter!("rate_limit_hits_total",
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}
