//! Queue and match records.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::bot::is_fallback_id;
use crate::game::entities::{GameMode, PlayerId, Team};
use crate::stake::Stake;

/// Queue bucket key.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct QueueKey {
    pub stake: Stake,
    pub mode: GameMode,
}

impl QueueKey {
    pub fn new(stake: Stake, mode: GameMode) -> Self {
        Self { stake, mode }
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.stake, self.mode)
    }
}

/// A player waiting in a bucket.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub player_id: PlayerId,
    pub stake: Stake,
    pub mode: GameMode,
    pub enqueued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn new(
        player_id: PlayerId,
        stake: Stake,
        mode: GameMode,
        now: DateTime<Utc>,
        max_wait: TimeDelta,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            stake,
            mode,
            enqueued_at: now,
            expires_at: now + max_wait,
        }
    }

    pub fn key(&self) -> QueueKey {
        QueueKey::new(self.stake, self.mode)
    }

    pub fn waited(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.enqueued_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Seat assignment inside a formed match.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Seat {
    pub player_id: PlayerId,
    pub seat: usize,
    pub team: Team,
    pub fallback: bool,
}

/// A formed match, human and fallback participants in seat order.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Match {
    pub id: String,
    pub seats: Vec<Seat>,
    pub stake: Stake,
    pub mode: GameMode,
    pub has_fallback: bool,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn new(
        participants: Vec<PlayerId>,
        stake: Stake,
        mode: GameMode,
        now: DateTime<Utc>,
    ) -> Self {
        let seats: Vec<Seat> = participants
            .into_iter()
            .enumerate()
            .map(|(seat, player_id)| Seat {
                fallback: is_fallback_id(&player_id),
                team: mode.team_for_seat(seat),
                player_id,
                seat,
            })
            .collect();
        Self {
            id: Uuid::new_v4().to_string(),
            has_fallback: seats.iter().any(|s| s.fallback),
            seats,
            stake,
            mode,
            created_at: now,
        }
    }

    pub fn participants(&self) -> Vec<PlayerId> {
        self.seats.iter().map(|s| s.player_id.clone()).collect()
    }

    pub fn fallback_ids(&self) -> Vec<PlayerId> {
        self.seats
            .iter()
            .filter(|s| s.fallback)
            .map(|s| s.player_id.clone())
            .collect()
    }

    pub fn human_ids(&self) -> Vec<PlayerId> {
        self.seats
            .iter()
            .filter(|s| !s.fallback)
            .map(|s| s.player_id.clone())
            .collect()
    }

    pub fn contains(&self, player: &PlayerId) -> bool {
        self.seats.iter().any(|s| &s.player_id == player)
    }
}
