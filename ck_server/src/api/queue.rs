//! Queue API handlers.
//!
//! Joining validates the stake, queues the caller and runs an immediate
//! matching pass on their bucket, so a caller may come back already seated.
//!
//! # Examples
//!
//! ```bash
//! curl -X POST http://localhost:3001/api/v1/queue/join \
//!   -H "x-player-id: alice" \
//!   -H "Content-Type: application/json" \
//!   -d '{"stake": 5, "mode": "1v1"}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
};
use chkobba::{GameMode, PlayerId, matchmaking::QueueEntry, stake::Stake};
use serde::{Deserialize, Serialize};

use super::{AppState, errors::ApiError};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct QueueRequest {
    pub stake: Stake,
    pub mode: GameMode,
}

#[derive(Debug, Serialize)]
pub struct JoinQueueResponse {
    pub entry: QueueEntry,
    /// Set when the join completed a match right away
    pub match_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelQueueResponse {
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct QueueSizeResponse {
    pub stake: Stake,
    pub mode: GameMode,
    pub size: usize,
}

/// Join the (stake, mode) queue.
///
/// # Errors
///
/// - `400 Bad Request`: stake outside the allow-list
/// - `409 Conflict`: caller already waits in a queue or is seated in a match
pub async fn join_queue(
    State(state): State<AppState>,
    Extension(player): Extension<PlayerId>,
    Json(request): Json<QueueRequest>,
) -> Result<Json<JoinQueueResponse>, ApiError> {
    let entry = state
        .lobby
        .enqueue(player.clone(), request.stake, request.mode)
        .await?;
    logging::log_queue_event("join", player.as_str(), &entry.key().to_string());
    metrics::queue_joins_total(request.stake, &request.mode.to_string());

    // seated by this join's pass if the entry is already gone from the bucket
    let seated = if state.lobby.is_queued(&player, request.stake, request.mode).await {
        None
    } else {
        state.lobby.match_for_player(&player).await
    };
    if let Some(m) = &seated {
        metrics::matches_formed_total(m.has_fallback);
    }

    Ok(Json(JoinQueueResponse {
        entry,
        match_id: seated.map(|m| m.id),
    }))
}

/// Leave the (stake, mode) queue.
///
/// `cancelled` is false when the entry was already consumed into a match or
/// never existed.
pub async fn cancel_queue(
    State(state): State<AppState>,
    Extension(player): Extension<PlayerId>,
    Json(request): Json<QueueRequest>,
) -> Json<CancelQueueResponse> {
    let cancelled = state
        .lobby
        .dequeue(&player, request.stake, request.mode)
        .await;
    if cancelled {
        logging::log_queue_event(
            "cancel",
            player.as_str(),
            &format!("{}-{}", request.stake, request.mode),
        );
        metrics::queue_cancels_total(request.stake, &request.mode.to_string());
    }
    Json(CancelQueueResponse { cancelled })
}

/// Number of players waiting in one bucket.
pub async fn queue_size(
    State(state): State<AppState>,
    Path((stake, mode)): Path<(Stake, GameMode)>,
) -> Result<Json<QueueSizeResponse>, ApiError> {
    state.lobby.stake_policy().check(stake)?;
    Ok(Json(QueueSizeResponse {
        stake,
        mode,
        size: state.lobby.queue_size(stake, mode).await,
    }))
}
