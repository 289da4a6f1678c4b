//! HTTP/WebSocket API for the Chkobba server.
//!
//! Thin adapter over [`chkobba::Lobby`]: every handler translates a request
//! into one lobby operation and maps typed errors onto HTTP statuses.
//!
//! # Modules
//!
//! - [`queue`]: join, cancel and inspect (stake, mode) queues
//! - [`matches`]: views, moves, turn passing and match retirement
//! - [`websocket`]: live per-player views pushed on every state change
//! - [`middleware`]: caller identity from the `x-player-id` header
//! - [`errors`]: `ChkobbaError` to status code mapping
//!
//! # Identity
//!
//! Authentication happens upstream. The server trusts the `x-player-id`
//! header (or the `player_id` query parameter on the WebSocket route) as the
//! already-authenticated caller.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ck_server::api::{AppState, create_router};
//! use chkobba::{Lobby, LobbyConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState {
//!     lobby: Lobby::new(LobbyConfig::default()),
//! };
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod matches;
pub mod middleware;
pub mod queue;
pub mod rate_limiter;
pub mod request_id;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use chkobba::{GameMode, Lobby};
use serde_json::json;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// Cloning is cheap: the lobby keeps its registries behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub lobby: Lobby,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET  /health                          - Health check (public)
/// GET  /api/v1/config                   - Stakes, modes and queue timings (public)
/// GET  /api/v1/queue/{stake}/{mode}     - Queue size (public)
/// POST /api/v1/queue/join               - Join a queue (identity required)
/// POST /api/v1/queue/cancel             - Leave a queue (identity required)
/// GET  /api/v1/players/me/match         - Caller's current match (identity required)
/// GET  /api/v1/matches/{id}             - Caller's view of a match (identity required)
/// POST /api/v1/matches/{id}/moves       - Play a move and pass the turn (identity required)
/// POST /api/v1/matches/{id}/end-turn    - Pass the turn (identity required)
/// POST /api/v1/matches/{id}/complete    - Retire a match (identity required)
/// GET  /ws/{match_id}?player_id=<id>    - Live view stream
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router();

    let root_routes = Router::new()
        .route("/health", get(health_check))
        // WebSocket route reads identity from its query string
        .route("/ws/{match_id}", get(websocket::websocket_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    let public_routes = Router::new()
        .route("/config", get(get_config))
        .route("/queue/{stake}/{mode}", get(queue::queue_size));

    let protected_routes = Router::new()
        .route("/queue/join", post(queue::join_queue))
        .route("/queue/cancel", post(queue::cancel_queue))
        .route("/players/me/match", get(matches::my_match))
        .route("/matches/{match_id}", get(matches::get_view))
        .route("/matches/{match_id}/moves", post(matches::submit_move))
        .route("/matches/{match_id}/end-turn", post(matches::end_turn))
        .route("/matches/{match_id}/complete", post(matches::complete_match))
        .layer(axum::middleware::from_fn(middleware::identity_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// # Example
///
/// ```bash
/// curl http://localhost:3001/health
/// # {"status":"healthy","version":"0.1.0","matches":{"active_count":2},"timestamp":"..."}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let active_count = state.lobby.active_matches().await;
    crate::metrics::active_matches(active_count);

    let response = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "matches": {
            "active_count": active_count
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (StatusCode::OK, Json(response))
}

/// Discoverable configuration surface for clients.
async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.lobby.config();
    Json(json!({
        "valid_stakes": state.lobby.stake_policy().valid_stakes(),
        "modes": GameMode::ALL,
        "queue_wait_secs": config.queue_wait_secs,
        "queue_max_wait_secs": config.queue_max_wait_secs,
    }))
}
