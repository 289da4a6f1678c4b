//! Bucketed matchmaking queue.

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};

use super::models::{Match, QueueEntry, QueueKey};
use crate::bot::{fallback_id, is_fallback_id};
use crate::errors::{ChkobbaError, ChkobbaResult};
use crate::game::entities::{GameMode, PlayerId};
use crate::stake::Stake;

/// Wait after which entries can be seated with each other.
pub const DEFAULT_QUEUE_WAIT_SECS: u64 = 20;
/// Wait after which a lone entry is seated with fallback players.
pub const DEFAULT_QUEUE_MAX_WAIT_SECS: u64 = 30;
/// Upper bound for either wait; longer values are clamped.
pub const MAX_QUEUE_WAIT_SECS: u64 = 24 * 60 * 60;

/// Queue buckets plus the registry of formed matches.
#[derive(Debug)]
pub struct Matchmaker {
    /// Each bucket is kept ordered by enqueue time.
    buckets: BTreeMap<QueueKey, Vec<QueueEntry>>,
    matches: HashMap<String, Match>,
    queue_wait: TimeDelta,
    queue_max_wait: TimeDelta,
}

impl Matchmaker {
    pub fn new(queue_wait: TimeDelta, queue_max_wait: TimeDelta) -> Self {
        Self {
            buckets: BTreeMap::new(),
            matches: HashMap::new(),
            queue_wait,
            queue_max_wait,
        }
    }

    pub fn from_secs(queue_wait_secs: u64, queue_max_wait_secs: u64) -> Self {
        Self::new(
            Self::clamped_secs(queue_wait_secs),
            Self::clamped_secs(queue_max_wait_secs),
        )
    }

    fn clamped_secs(secs: u64) -> TimeDelta {
        // bounded well inside i64 and TimeDelta's range
        TimeDelta::seconds(secs.min(MAX_QUEUE_WAIT_SECS) as i64)
    }

    /// Fails when `player` may not take a new seat: fallback ids, players
    /// already waiting in any bucket, and players seated in a live match.
    pub fn ensure_free(&self, player: &PlayerId) -> ChkobbaResult<()> {
        if is_fallback_id(player) {
            return Err(ChkobbaError::ReservedPlayerId(player.clone()));
        }
        if self.queued_key(player).is_some() {
            return Err(ChkobbaError::AlreadyQueued(player.clone()));
        }
        if self.seated_in(player).is_some() {
            return Err(ChkobbaError::AlreadySeated(player.clone()));
        }
        Ok(())
    }

    /// Appends a new entry to the (stake, mode) bucket. A player holds at
    /// most one entry across all buckets.
    pub fn enqueue(
        &mut self,
        player: PlayerId,
        stake: Stake,
        mode: GameMode,
        now: DateTime<Utc>,
    ) -> ChkobbaResult<QueueEntry> {
        self.ensure_free(&player)?;
        let key = QueueKey::new(stake, mode);
        let bucket = self.buckets.entry(key).or_default();

        let entry = QueueEntry::new(player, stake, mode, now, self.queue_max_wait);
        let pos = bucket.partition_point(|e| e.enqueued_at <= entry.enqueued_at);
        bucket.insert(pos, entry.clone());
        debug!(
            "{} queued in {key} ({} waiting)",
            entry.player_id,
            bucket.len()
        );
        Ok(entry)
    }

    /// Removes the player's entry from the bucket. Empty buckets are dropped.
    pub fn dequeue(&mut self, player: &PlayerId, stake: Stake, mode: GameMode) -> bool {
        let key = QueueKey::new(stake, mode);
        let Some(bucket) = self.buckets.get_mut(&key) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|e| &e.player_id != player);
        let removed = bucket.len() != before;
        if bucket.is_empty() {
            self.buckets.remove(&key);
        }
        if removed {
            debug!("{player} left {key}");
        }
        removed
    }

    /// Forms at most one match from the bucket.
    ///
    /// Entries that waited at least the queue wait are seated together,
    /// earliest first. Failing that, the earliest expired entry is seated
    /// with fallback players in the remaining seats.
    pub fn try_form_match(
        &mut self,
        stake: Stake,
        mode: GameMode,
        now: DateTime<Utc>,
    ) -> Option<Match> {
        let key = QueueKey::new(stake, mode);
        let required = mode.required_players();
        let queue_wait = self.queue_wait;
        let bucket = self.buckets.get_mut(&key)?;

        let ready: Vec<usize> = bucket
            .iter()
            .enumerate()
            .filter(|(_, e)| e.waited(now) >= queue_wait)
            .map(|(i, _)| i)
            .take(required)
            .collect();

        let formed = if ready.len() == required {
            let mut participants = Vec::with_capacity(required);
            for idx in ready.into_iter().rev() {
                participants.push(bucket.remove(idx).player_id);
            }
            participants.reverse();
            Match::new(participants, stake, mode, now)
        } else {
            let idx = bucket.iter().position(|e| e.is_expired(now))?;
            let entry = bucket.remove(idx);
            let mut participants = vec![entry.player_id];
            participants.extend((1..required).map(|_| fallback_id()));
            Match::new(participants, stake, mode, now)
        };

        if bucket.is_empty() {
            self.buckets.remove(&key);
        }
        info!(
            "match {} formed in {key}: {:?} (fallback: {})",
            formed.id,
            formed.participants(),
            formed.has_fallback
        );
        self.matches.insert(formed.id.clone(), formed.clone());
        Some(formed)
    }

    /// Runs `try_form_match` over every bucket until nothing more forms.
    pub fn run_matching_pass(&mut self, now: DateTime<Utc>) -> Vec<Match> {
        let mut formed = Vec::new();
        loop {
            let keys: Vec<QueueKey> = self.buckets.keys().copied().collect();
            let before = formed.len();
            for key in keys {
                while let Some(m) = self.try_form_match(key.stake, key.mode, now) {
                    formed.push(m);
                }
            }
            if formed.len() == before {
                break;
            }
        }
        formed
    }

    /// Records a match formed outside the queue.
    pub fn register_match(&mut self, formed: Match) {
        self.matches.insert(formed.id.clone(), formed);
    }

    /// Releases bookkeeping for a finished or abandoned match.
    pub fn complete_match(&mut self, match_id: &str) -> Option<Match> {
        let released = self.matches.remove(match_id);
        if released.is_some() {
            debug!("match {match_id} released");
        }
        released
    }

    pub fn get_match(&self, match_id: &str) -> Option<&Match> {
        self.matches.get(match_id)
    }

    pub fn queue_size(&self, stake: Stake, mode: GameMode) -> usize {
        self.buckets
            .get(&QueueKey::new(stake, mode))
            .map_or(0, Vec::len)
    }

    pub fn is_queued(&self, player: &PlayerId, stake: Stake, mode: GameMode) -> bool {
        self.buckets
            .get(&QueueKey::new(stake, mode))
            .is_some_and(|bucket| bucket.iter().any(|e| &e.player_id == player))
    }

    /// The bucket the player waits in, if any.
    pub fn queued_key(&self, player: &PlayerId) -> Option<QueueKey> {
        self.buckets
            .iter()
            .find(|(_, bucket)| bucket.iter().any(|e| &e.player_id == player))
            .map(|(key, _)| *key)
    }

    /// The live match the player is seated in, if any.
    pub fn seated_in(&self, player: &PlayerId) -> Option<&Match> {
        self.matches.values().find(|m| m.contains(player))
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn queue_wait(&self) -> TimeDelta {
        self.queue_wait
    }

    pub fn queue_max_wait(&self) -> TimeDelta {
        self.queue_max_wait
    }
}

impl Default for Matchmaker {
    fn default() -> Self {
        Self::from_secs(DEFAULT_QUEUE_WAIT_SECS, DEFAULT_QUEUE_MAX_WAIT_SECS)
    }
}
