//! Chkobba rule engine.
//!
//! - Card/deck model with an explicit Fisher-Yates shuffle
//! - Match state machine: deal, play, capture, chkobba, turn rotation
//! - Round scoring and match termination
//! - Full snapshots and per-player redacted views

pub mod entities;
pub mod state_machine;

pub use entities::{
    Card, CardId, DECK_SIZE, Deck, GameMode, Move, MoveAction, MoveRecord, Phase, Player,
    PlayerId, PlayerView, Rank, Suit, Team, Value,
};
pub use state_machine::{
    ChkobbaEngine, GameState, GameView, HAND_SIZE, MAX_ROUNDS, TABLE_DEAL_SIZE, TurnOutcome,
    WINNING_SCORE,
};
