//! WebSocket handler for live match updates.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{match_id}?player_id=<id>`
//! 2. Server checks the caller is seated in the match, then upgrades
//! 3. The caller's current view is pushed immediately
//! 4. Every state change of the match actor pushes a fresh view
//! 5. On disconnect the subscription is dropped; the seat is kept
//!
//! # Client Messages
//!
//! ```json
//! {"type": "move", "move": {"kind": "play", "card": "clubs-K"}}
//! {"type": "end_turn"}
//! ```
//!
//! # Server Messages
//!
//! ```json
//! {"type": "state", "event": {"kind": "move_applied", ...}, "view": {...}}
//! {"type": "success", "message": "..."}
//! {"type": "error", "message": "..."}
//! ```

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use chkobba::{
    GameView, Move, PlayerId,
    lobby::{NotificationKind, StateChangeNotification},
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{
    AppState,
    errors::ApiError,
    matches::{pass_turn, play_move},
    middleware::parse_player_id,
    rate_limiter::SocketLimiter,
};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    player_id: Option<String>,
}

/// Client messages received via WebSocket
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Move {
        #[serde(rename = "move")]
        mv: Move,
    },
    EndTurn,
}

/// Messages sent to the client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    State {
        event: Option<NotificationKind>,
        view: GameView,
    },
    Success {
        message: String,
    },
    Error {
        message: String,
    },
}

/// Upgrade to a WebSocket streaming the caller's view of a match.
///
/// # Errors
///
/// - `401 Unauthorized`: missing `player_id`
/// - `403 Forbidden`: caller is not seated in the match
/// - `404 Not Found`: unknown match
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(match_id): Path<String>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let player = match parse_player_id(query.player_id.as_deref()) {
        Ok(player) => player,
        Err(status) => return status.into_response(),
    };

    let view = match state.lobby.view(&match_id, player.clone()).await {
        Ok(view) => view,
        Err(e) => return ApiError(e).into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, match_id, player, view, state))
}

async fn handle_socket(
    socket: WebSocket,
    match_id: String,
    player: PlayerId,
    initial_view: GameView,
    state: AppState,
) {
    let (mut sender, mut receiver) = socket.split();
    logging::log_socket_event("connected", &match_id, player.as_str());
    metrics::websocket_connections_total();

    let subscriber_id = format!("{player}/{}", Uuid::new_v4().simple());
    let mut notifications = match state.lobby.subscribe(&match_id, &subscriber_id).await {
        Ok(rx) => rx,
        Err(e) => {
            tracing::warn!(match_id = %match_id, "Subscribe failed: {e}");
            return;
        }
    };

    let initial = ServerMessage::State {
        event: None,
        view: initial_view,
    };
    if send_json(&mut sender, &initial).await.is_err() {
        let _ = state.lobby.unsubscribe(&match_id, &subscriber_id).await;
        return;
    }

    let (response_tx, mut response_rx) = mpsc::channel::<ServerMessage>(32);

    let send_state = state.clone();
    let send_match_id = match_id.clone();
    let send_player = player.clone();
    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                notification = notifications.recv() => {
                    // channel closes when the actor stops
                    let Some(StateChangeNotification { kind, .. }) = notification else {
                        break;
                    };
                    if kind == NotificationKind::Closed {
                        break;
                    }
                    let view = match send_state
                        .lobby
                        .view(&send_match_id, send_player.clone())
                        .await
                    {
                        Ok(view) => view,
                        Err(e) => {
                            tracing::debug!(match_id = %send_match_id, "View unavailable: {e}");
                            break;
                        }
                    };
                    let message = ServerMessage::State { event: Some(kind), view };
                    if send_json(&mut sender, &message).await.is_err() {
                        break;
                    }
                }
                Some(response) = response_rx.recv() => {
                    if send_json(&mut sender, &response).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let mut limiter = SocketLimiter::new();
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                metrics::websocket_messages_received();

                if let Err(limit) = limiter.check() {
                    tracing::warn!(
                        match_id = %match_id,
                        player_id = %player,
                        "{} rate limit exceeded",
                        limit.name()
                    );
                    metrics::rate_limit_hits_total(limit.name());
                    let _ = response_tx
                        .send(ServerMessage::Error {
                            message: limit.message().to_string(),
                        })
                        .await;
                    continue;
                }

                let response = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => {
                        handle_client_message(client_msg, &match_id, &player, &state).await
                    }
                    Err(e) => {
                        tracing::debug!("Failed to parse client message: {e}");
                        ServerMessage::Error {
                            message: "Invalid message format".to_string(),
                        }
                    }
                };

                if response_tx.send(response).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::debug!("WebSocket error: {e}");
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    // the match may already be retired
    let _ = state.lobby.unsubscribe(&match_id, &subscriber_id).await;
    logging::log_socket_event("disconnected", &match_id, player.as_str());
}

async fn handle_client_message(
    msg: ClientMessage,
    match_id: &str,
    player: &PlayerId,
    state: &AppState,
) -> ServerMessage {
    let result = match msg {
        ClientMessage::Move { mv } => play_move(state, match_id, player, mv)
            .await
            .map(|outcome| outcome.record.to_string()),
        ClientMessage::EndTurn => pass_turn(state, match_id, player)
            .await
            .map(|_| "Turn passed".to_string()),
    };

    match result {
        Ok(message) => ServerMessage::Success { message },
        Err(e) => ServerMessage::Error {
            message: e.client_message(),
        },
    }
}

async fn send_json(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize server message: {e}");
            return Ok(());
        }
    };
    sender.send(Message::Text(json.into())).await?;
    metrics::websocket_messages_sent();
    Ok(())
}
