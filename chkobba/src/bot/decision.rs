//! Fallback move selection.

use log::debug;
use rand::Rng;

use crate::game::{Card, ChkobbaEngine, Move, PlayerId};

/// Probability that a staked fallback is flagged to favor winning.
const FAVOR_WIN_PROBABILITY: f64 = 0.8;

/// Automated participant.
#[derive(Debug, Clone)]
pub struct FallbackPlayer {
    pub id: PlayerId,
    /// Computed at creation; move selection ignores it.
    favor_win: bool,
}

impl FallbackPlayer {
    pub fn new(id: PlayerId, staked: bool) -> Self {
        let favor_win = staked && rand::rng().random_bool(FAVOR_WIN_PROBABILITY);
        Self { id, favor_win }
    }

    pub fn favors_win(&self) -> bool {
        self.favor_win
    }

    /// Picks a move from the live engine. `None` when the hand is empty or
    /// the fallback is not seated.
    pub fn choose_move(&self, engine: &ChkobbaEngine) -> Option<Move> {
        let hand = engine.hand(&self.id)?;
        let mv = self.choose_move_with(hand, &mut rand::rng());
        if let Some(mv) = &mv {
            debug!("{} picks {}", self.id, mv.card());
        }
        mv
    }

    /// Uniformly random card from `hand`, always as a plain play.
    pub fn choose_move_with<R: Rng + ?Sized>(&self, hand: &[Card], rng: &mut R) -> Option<Move> {
        if hand.is_empty() {
            return None;
        }
        let card = hand[rng.random_range(0..hand.len())];
        Some(Move::Play { card: card.id() })
    }
}
