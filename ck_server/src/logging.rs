//! Structured logging configuration.
//!
//! The library logs through the `log` facade; the subscriber installed here
//! picks those records up alongside the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use ck_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,tower_http=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a player's queue activity
///
/// # Arguments
///
/// * `event_type` - `join` or `cancel`
/// * `player_id` - Player identity taken from the request
/// * `queue` - Bucket key, e.g. `5-1v1`
pub fn log_queue_event(event_type: &str, player_id: &str, queue: &str) {
    tracing::info!(
        event_type = event_type,
        player_id = player_id,
        queue = queue,
        "Queue event"
    );
}

/// Log a rejected move
///
/// Rule violations are expected traffic, so they stay at debug.
pub fn log_rejected_move(match_id: &str, player_id: &str, reason: &str) {
    tracing::debug!(
        match_id = match_id,
        player_id = player_id,
        reason = reason,
        "Move rejected"
    );
}

/// Log WebSocket connect/disconnect
pub fn log_socket_event(event_type: &str, match_id: &str, player_id: &str) {
    tracing::info!(
        event_type = event_type,
        match_id = match_id,
        player_id = player_id,
        "WebSocket event"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_queue_event() {
        // Just ensure it doesn't panic
        log_queue_event("join", "alice", "5-1v1");
        log_queue_event("cancel", "alice", "5-1v1");
    }

    #[test]
    fn test_log_rejected_move() {
        log_rejected_move("m1", "alice", "Not your turn");
    }

    #[test]
    fn test_log_socket_event() {
        log_socket_event("connected", "m1", "alice");
        log_socket_event("disconnected", "m1", "alice");
    }
}
