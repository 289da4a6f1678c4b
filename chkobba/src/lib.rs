//! # Chkobba
//!
//! Rule engine, stake policy, scripted fallback player and matchmaking for
//! a two- or four-player Chkobba card game.
//!
//! ## Core Modules
//!
//! - [`game`]: cards, deck, and the match state machine
//! - [`stake`]: stake allow-list and payouts
//! - [`bot`]: the scripted fallback player
//! - [`matchmaking`]: (stake, mode) queue buckets and match formation
//! - [`lobby`]: per-match actors and the service tying everything together
//!
//! ## Match lifecycle
//!
//! A match moves through `setup → playing → round_end → {setup | match_end}`.
//! Rounds end when every hand and the deck are empty. The match ends once a
//! player reaches 21 points or after the third round.
//!
//! ## Example
//!
//! ```
//! use chkobba::game::{ChkobbaEngine, GameMode, Move, PlayerId};
//!
//! let players = [PlayerId::new("alice"), PlayerId::new("bob")];
//! let mut engine = ChkobbaEngine::new("match-1", GameMode::OneVsOne, 5, &players).unwrap();
//! engine.deal_initial_cards().unwrap();
//!
//! let card = engine.hand(&players[0]).unwrap()[0].id();
//! engine.apply_move(&players[0], &Move::Play { card }).unwrap();
//! engine.end_turn().unwrap();
//! assert_eq!(engine.current_player(), &players[1]);
//! ```

/// Scripted fallback player.
pub mod bot;

/// Typed errors.
pub mod errors;
pub use errors::{ChkobbaError, ChkobbaResult};

/// Card model and match state machine.
pub mod game;
pub use game::{ChkobbaEngine, GameMode, GameState, GameView, Move, Phase, PlayerId};

/// Match actors and the lobby service.
pub mod lobby;
pub use lobby::{Lobby, LobbyConfig};

/// Queue buckets and match formation.
pub mod matchmaking;

/// Stake allow-list and settlement.
pub mod stake;
pub use stake::{Outcome, StakePolicy};
