//! Stake data models.

use serde::{Deserialize, Serialize};

use crate::game::entities::{PlayerId, Team};

/// Placeholder for stake amounts, in whole currency units.
pub type Stake = u32;

/// Result of a finished match from one participant's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
        }
    }
}

/// Per-participant settlement line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub player_id: PlayerId,
    pub team: Team,
    pub stake: Stake,
    pub outcome: Outcome,
    pub payout: Stake,
}
