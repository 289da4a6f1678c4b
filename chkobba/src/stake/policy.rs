//! Stake allow-list and payout rules.

use log::debug;

use super::models::{Outcome, Settlement, Stake};
use crate::errors::{ChkobbaError, ChkobbaResult};
use crate::game::{GameState, Phase};

/// Stakes accepted when no allow-list is configured.
pub const DEFAULT_VALID_STAKES: [Stake; 4] = [1, 3, 5, 10];

/// Fixed allow-list of stake amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakePolicy {
    valid_stakes: Vec<Stake>,
}

impl StakePolicy {
    /// Builds a policy from an allow-list. Duplicates are dropped and the
    /// list is kept sorted.
    pub fn new(stakes: impl IntoIterator<Item = Stake>) -> Self {
        let mut valid_stakes: Vec<Stake> = stakes.into_iter().collect();
        valid_stakes.sort_unstable();
        valid_stakes.dedup();
        Self { valid_stakes }
    }

    pub fn is_valid_stake(&self, amount: Stake) -> bool {
        self.valid_stakes.binary_search(&amount).is_ok()
    }

    /// Returns `amount` if it is allowed, `InvalidStake` otherwise.
    pub fn check(&self, amount: Stake) -> ChkobbaResult<Stake> {
        if self.is_valid_stake(amount) {
            Ok(amount)
        } else {
            Err(ChkobbaError::InvalidStake(amount))
        }
    }

    pub fn valid_stakes(&self) -> &[Stake] {
        &self.valid_stakes
    }

    /// A win pays double the stake, a loss pays nothing.
    pub fn payout(&self, stake: Stake, outcome: Outcome) -> Stake {
        match outcome {
            Outcome::Win => stake.saturating_mul(2),
            Outcome::Loss => 0,
        }
    }

    /// Settles a finished match: everyone on the winner's team wins.
    pub fn settle(&self, state: &GameState) -> ChkobbaResult<Vec<Settlement>> {
        if state.status != Phase::MatchEnd {
            return Err(ChkobbaError::InvalidPhase(state.status));
        }
        let winner = state
            .winner
            .as_ref()
            .and_then(|id| state.player(id))
            .ok_or_else(|| ChkobbaError::Internal("finished match has no winner".to_string()))?;

        let settlements: Vec<Settlement> = state
            .players
            .iter()
            .map(|p| {
                let outcome = if p.team == winner.team {
                    Outcome::Win
                } else {
                    Outcome::Loss
                };
                Settlement {
                    player_id: p.id.clone(),
                    team: p.team,
                    stake: state.stake,
                    outcome,
                    payout: self.payout(state.stake, outcome),
                }
            })
            .collect();
        debug!("match {} settled: {settlements:?}", state.match_id);
        Ok(settlements)
    }
}

impl Default for StakePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_VALID_STAKES)
    }
}
