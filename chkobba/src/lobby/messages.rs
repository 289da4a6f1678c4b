//! Match actor message types.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::errors::ChkobbaResult;
use crate::game::{GameState, GameView, Move, MoveRecord, PlayerId, TurnOutcome};

/// Messages that can be sent to a MatchActor
#[derive(Debug)]
pub enum MatchMessage {
    /// Deal the opening cards
    Deal {
        response: oneshot::Sender<ChkobbaResult<GameState>>,
    },

    /// Apply a participant's move, optionally passing the turn afterwards
    ApplyMove {
        player_id: PlayerId,
        mv: Move,
        end_turn: bool,
        response: oneshot::Sender<ChkobbaResult<MoveOutcome>>,
    },

    /// Pass the turn to the next seat; refused unless `player_id` is to act
    EndTurn {
        player_id: PlayerId,
        response: oneshot::Sender<ChkobbaResult<TurnOutcome>>,
    },

    /// Full state snapshot
    GetSnapshot {
        response: oneshot::Sender<GameState>,
    },

    /// Redacted view for one participant
    GetView {
        player_id: PlayerId,
        response: oneshot::Sender<ChkobbaResult<GameView>>,
    },

    /// Drive fallback players once
    Tick,

    /// Subscribe to state change notifications
    Subscribe {
        subscriber_id: String,
        sender: mpsc::Sender<StateChangeNotification>,
    },

    /// Unsubscribe from state change notifications
    Unsubscribe { subscriber_id: String },

    /// Retire the match; replies with the final state
    Close {
        response: oneshot::Sender<GameState>,
    },
}

/// Result of an applied move
#[derive(Debug, Clone, Serialize)]
pub struct MoveOutcome {
    pub record: MoveRecord,
    /// Present when the turn was passed as part of the move
    pub turn: Option<TurnOutcome>,
    pub state: GameState,
}

/// What changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationKind {
    Dealt,
    MoveApplied { record: MoveRecord },
    TurnEnded,
    RoundEnded { round: u8 },
    MatchEnded { winner: PlayerId },
    Closed,
}

impl From<&TurnOutcome> for NotificationKind {
    fn from(outcome: &TurnOutcome) -> Self {
        match outcome {
            TurnOutcome::Continued | TurnOutcome::Redealt => Self::TurnEnded,
            TurnOutcome::RoundEnded { round } => Self::RoundEnded { round: *round },
            TurnOutcome::MatchEnded { winner } => Self::MatchEnded {
                winner: winner.clone(),
            },
        }
    }
}

/// Notification sent when match state changes, carrying the full snapshot
#[derive(Debug, Clone)]
pub struct StateChangeNotification {
    pub kind: NotificationKind,
    pub state: Arc<GameState>,
}
