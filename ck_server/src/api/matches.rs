//! Match API handlers.
//!
//! Callers only ever see their own redacted [`GameView`]; full snapshots stay
//! inside the server.
//!
//! # Examples
//!
//! Capture the 2♦ and 3♣ with the 5♥:
//! ```bash
//! curl -X POST http://localhost:3001/api/v1/matches/$MATCH/moves \
//!   -H "x-player-id: alice" \
//!   -H "Content-Type: application/json" \
//!   -d '{"kind": "capture", "card": "hearts-5", "table_cards": ["diamonds-2", "clubs-3"]}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
};
use chkobba::{
    ChkobbaError, GameView, Move, PlayerId,
    game::{MoveAction, MoveRecord, TurnOutcome},
    lobby::MoveOutcome,
    matchmaking::Match,
    stake::Settlement,
};
use serde::Serialize;

use super::{AppState, errors::ApiError};
use crate::{logging, metrics};

#[derive(Debug, Serialize)]
pub struct MoveResponse {
    pub record: MoveRecord,
    pub turn: Option<TurnOutcome>,
    pub view: GameView,
}

#[derive(Debug, Serialize)]
pub struct EndTurnResponse {
    pub turn: TurnOutcome,
    pub view: GameView,
}

#[derive(Debug, Serialize)]
pub struct CompleteMatchResponse {
    pub match_id: String,
    /// Absent when the match was abandoned before it ended
    pub settlements: Option<Vec<Settlement>>,
}

pub(crate) fn move_kind(mv: &Move) -> &'static str {
    match mv.action() {
        MoveAction::Play => "play",
        MoveAction::Capture => "capture",
        MoveAction::Chkobba => "chkobba",
    }
}

/// Apply a move for the caller and pass the turn, recording the attempt.
pub(crate) async fn play_move(
    state: &AppState,
    match_id: &str,
    player: &PlayerId,
    mv: Move,
) -> Result<MoveOutcome, ChkobbaError> {
    let kind = move_kind(&mv);
    let result = state.lobby.play_turn(match_id, player.clone(), mv).await;
    metrics::moves_total(kind, result.is_ok());
    if let Err(e) = &result {
        logging::log_rejected_move(match_id, player.as_str(), &e.client_message());
    }
    result
}

/// The match the caller is currently seated in.
///
/// # Errors
///
/// - `404 Not Found`: caller is not seated anywhere
pub async fn my_match(
    State(state): State<AppState>,
    Extension(player): Extension<PlayerId>,
) -> Result<Json<Match>, ApiError> {
    state
        .lobby
        .match_for_player(&player)
        .await
        .map(Json)
        .ok_or_else(|| ApiError(ChkobbaError::MatchNotFound(player.to_string())))
}

/// The caller's view of a match.
///
/// # Errors
///
/// - `403 Forbidden`: caller is not a participant
/// - `404 Not Found`: unknown match
pub async fn get_view(
    State(state): State<AppState>,
    Extension(player): Extension<PlayerId>,
    Path(match_id): Path<String>,
) -> Result<Json<GameView>, ApiError> {
    Ok(Json(state.lobby.view(&match_id, player).await?))
}

/// Apply a move and pass the turn.
///
/// The body is a tagged [`Move`]:
///
/// ```json
/// {"kind": "play", "card": "clubs-K"}
/// {"kind": "capture", "card": "hearts-5", "table_cards": ["diamonds-2", "clubs-3"]}
/// {"kind": "chkobba", "card": "spades-7"}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: card not in hand, capture sum mismatch, chkobba precondition
/// - `403 Forbidden`: caller is not a participant
/// - `409 Conflict`: not the caller's turn, or the match is not in play
pub async fn submit_move(
    State(state): State<AppState>,
    Extension(player): Extension<PlayerId>,
    Path(match_id): Path<String>,
    Json(mv): Json<Move>,
) -> Result<Json<MoveResponse>, ApiError> {
    let outcome = play_move(&state, &match_id, &player, mv).await?;
    let view = state.lobby.view(&match_id, player).await?;
    Ok(Json(MoveResponse {
        record: outcome.record,
        turn: outcome.turn,
        view,
    }))
}

/// Pass the caller's turn. Only the acting player may pass; the match
/// actor checks the turn and rotates it in one step.
pub(crate) async fn pass_turn(
    state: &AppState,
    match_id: &str,
    player: &PlayerId,
) -> Result<TurnOutcome, ChkobbaError> {
    let result = state.lobby.end_turn(match_id, player.clone()).await;
    if let Err(e) = &result {
        logging::log_rejected_move(match_id, player.as_str(), &e.client_message());
    }
    result
}

/// Pass the turn without moving.
///
/// # Errors
///
/// - `403 Forbidden`: caller is not a participant
/// - `409 Conflict`: not the caller's turn, or the match is not in play
pub async fn end_turn(
    State(state): State<AppState>,
    Extension(player): Extension<PlayerId>,
    Path(match_id): Path<String>,
) -> Result<Json<EndTurnResponse>, ApiError> {
    let turn = pass_turn(&state, &match_id, &player).await?;
    let view = state.lobby.view(&match_id, player).await?;
    Ok(Json(EndTurnResponse { turn, view }))
}

/// Retire a match. Finished matches come back with their settlements.
///
/// # Errors
///
/// - `403 Forbidden`: caller is not a participant
/// - `404 Not Found`: unknown or already retired match
pub async fn complete_match(
    State(state): State<AppState>,
    Extension(player): Extension<PlayerId>,
    Path(match_id): Path<String>,
) -> Result<Json<CompleteMatchResponse>, ApiError> {
    let formed = state.lobby.get_match(&match_id).await?;
    if !formed.contains(&player) {
        return Err(ApiError(ChkobbaError::PlayerNotInMatch(player)));
    }

    let settlements = state.lobby.complete_match(&match_id).await?;
    metrics::matches_completed_total(settlements.is_some());
    tracing::info!(
        match_id = %match_id,
        player_id = %player,
        settled = settlements.is_some(),
        "Match retired"
    );

    Ok(Json(CompleteMatchResponse {
        match_id,
        settlements,
    }))
}
