//! Lobby service: composes the stake policy, the matchmaking queue and the
//! match registry behind one cloneable handle.

use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::{
    sync::{Mutex, RwLock, mpsc},
    time::{Duration, MissedTickBehavior, interval},
};

use super::{
    config::LobbyConfig,
    manager::MatchManager,
    messages::{MoveOutcome, StateChangeNotification},
};
use crate::{
    bot::fallback_id,
    errors::{ChkobbaError, ChkobbaResult},
    game::{GameMode, GameState, GameView, Move, Phase, PlayerId, TurnOutcome},
    matchmaking::{Match, Matchmaker, QueueEntry},
    stake::{Settlement, Stake, StakePolicy},
};

/// Entry point for queueing, match lifecycle and moves.
#[derive(Clone)]
pub struct Lobby {
    config: LobbyConfig,
    policy: StakePolicy,

    /// Queue buckets; every mutation happens under this lock
    matchmaker: Arc<Mutex<Matchmaker>>,

    matches: Arc<MatchManager>,

    /// Human player id to the match they were seated in
    assignments: Arc<RwLock<HashMap<PlayerId, String>>>,
}

impl Lobby {
    pub fn new(config: LobbyConfig) -> Self {
        Self {
            policy: StakePolicy::new(config.valid_stakes.iter().copied()),
            matchmaker: Arc::new(Mutex::new(Matchmaker::from_secs(
                config.queue_wait_secs,
                config.queue_max_wait_secs,
            ))),
            matches: Arc::new(MatchManager::new(config.clone())),
            assignments: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    pub fn stake_policy(&self) -> &StakePolicy {
        &self.policy
    }

    // === Queue ===

    /// Queue a player, then run a matching pass on their bucket.
    ///
    /// Fails for fallback ids, for players already waiting in any bucket
    /// and for players seated in a live match.
    pub async fn enqueue(
        &self,
        player: PlayerId,
        stake: Stake,
        mode: GameMode,
    ) -> ChkobbaResult<QueueEntry> {
        self.enqueue_at(player, stake, mode, Utc::now()).await
    }

    pub async fn enqueue_at(
        &self,
        player: PlayerId,
        stake: Stake,
        mode: GameMode,
        now: DateTime<Utc>,
    ) -> ChkobbaResult<QueueEntry> {
        self.policy.check(stake)?;

        let (entry, formed) = {
            let mut matchmaker = self.matchmaker.lock().await;
            let entry = matchmaker.enqueue(player, stake, mode, now)?;
            let mut formed = Vec::new();
            while let Some(m) = matchmaker.try_form_match(stake, mode, now) {
                formed.push(m);
            }
            (entry, formed)
        };

        self.start_matches(formed).await;
        Ok(entry)
    }

    /// Remove a player's entry. False when it was already consumed or never
    /// existed.
    pub async fn dequeue(&self, player: &PlayerId, stake: Stake, mode: GameMode) -> bool {
        self.matchmaker.lock().await.dequeue(player, stake, mode)
    }

    /// Whether the player still waits in the (stake, mode) bucket.
    pub async fn is_queued(&self, player: &PlayerId, stake: Stake, mode: GameMode) -> bool {
        self.matchmaker.lock().await.is_queued(player, stake, mode)
    }

    pub async fn queue_size(&self, stake: Stake, mode: GameMode) -> usize {
        self.matchmaker.lock().await.queue_size(stake, mode)
    }

    /// One matching pass over every bucket at the current time.
    pub async fn run_matching_pass(&self) -> Vec<Match> {
        self.run_matching_pass_at(Utc::now()).await
    }

    pub async fn run_matching_pass_at(&self, now: DateTime<Utc>) -> Vec<Match> {
        let formed = self.matchmaker.lock().await.run_matching_pass(now);
        self.start_matches(formed).await
    }

    /// Runs matching passes on a fixed tick until the task is dropped.
    pub async fn run_matching_loop(self) {
        let mut ticker = interval(Duration::from_millis(self.config.matching_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::info!(
            "Matching loop running every {}ms",
            self.config.matching_interval_ms
        );
        loop {
            ticker.tick().await;
            let formed = self.run_matching_pass().await;
            if !formed.is_empty() {
                log::debug!("Matching pass formed {} matches", formed.len());
            }
        }
    }

    /// Creates and deals an engine for each formed match. Matches that fail
    /// to start are released and dropped from the result.
    async fn start_matches(&self, formed: Vec<Match>) -> Vec<Match> {
        let mut started = Vec::with_capacity(formed.len());
        for m in formed {
            match self.start_match(&m).await {
                Ok(_) => started.push(m),
                Err(e) => {
                    log::error!("Match {} failed to start: {e}", m.id);
                    let _ = self.matches.close_match(&m.id).await;
                    self.matchmaker.lock().await.complete_match(&m.id);
                    self.assignments
                        .write()
                        .await
                        .retain(|_, assigned| assigned != &m.id);
                }
            }
        }
        started
    }

    async fn start_match(&self, m: &Match) -> ChkobbaResult<GameState> {
        self.matches
            .create_match(&m.id, m.mode, m.stake, &m.participants())
            .await?;
        let mut assignments = self.assignments.write().await;
        for player in m.human_ids() {
            assignments.insert(player, m.id.clone());
        }
        drop(assignments);
        self.matches.deal(&m.id).await
    }

    // === Match lifecycle ===

    /// Registers a match for the given human participants without dealing
    /// it.
    pub async fn create_match(
        &self,
        mode: GameMode,
        stake: Stake,
        participants: Vec<PlayerId>,
    ) -> ChkobbaResult<Match> {
        self.register_match(mode, stake, participants, false).await
    }

    /// Like [`Self::create_match`], with every seat `humans` leaves open
    /// taken by a fallback player.
    pub async fn create_match_with_fallbacks(
        &self,
        mode: GameMode,
        stake: Stake,
        humans: Vec<PlayerId>,
    ) -> ChkobbaResult<Match> {
        self.register_match(mode, stake, humans, true).await
    }

    async fn register_match(
        &self,
        mode: GameMode,
        stake: Stake,
        mut participants: Vec<PlayerId>,
        fill_with_fallbacks: bool,
    ) -> ChkobbaResult<Match> {
        self.policy.check(stake)?;
        let m = {
            let mut matchmaker = self.matchmaker.lock().await;
            for player in &participants {
                matchmaker.ensure_free(player)?;
            }
            if fill_with_fallbacks {
                let open = mode.required_players().saturating_sub(participants.len());
                participants.extend((0..open).map(|_| fallback_id()));
            }
            let m = Match::new(participants, stake, mode, Utc::now());
            matchmaker.register_match(m.clone());
            m
        };

        if let Err(e) = self
            .matches
            .create_match(&m.id, mode, stake, &m.participants())
            .await
        {
            self.matchmaker.lock().await.complete_match(&m.id);
            return Err(e);
        }
        let mut assignments = self.assignments.write().await;
        for player in m.human_ids() {
            assignments.insert(player, m.id.clone());
        }
        Ok(m)
    }

    pub async fn deal(&self, match_id: &str) -> ChkobbaResult<GameState> {
        self.matches.deal(match_id).await
    }

    /// Applies a move without passing the turn.
    pub async fn apply_move(
        &self,
        match_id: &str,
        player: PlayerId,
        mv: Move,
    ) -> ChkobbaResult<MoveOutcome> {
        self.matches.apply_move(match_id, player, mv, false).await
    }

    /// Applies a move and passes the turn in one step.
    pub async fn play_turn(
        &self,
        match_id: &str,
        player: PlayerId,
        mv: Move,
    ) -> ChkobbaResult<MoveOutcome> {
        self.matches.apply_move(match_id, player, mv, true).await
    }

    /// Passes `player`'s turn. The turn check and the rotation happen in
    /// one actor step, so a repeated pass cannot take the next seat's turn.
    pub async fn end_turn(&self, match_id: &str, player: PlayerId) -> ChkobbaResult<TurnOutcome> {
        self.matches.end_turn(match_id, player).await
    }

    pub async fn snapshot(&self, match_id: &str) -> ChkobbaResult<GameState> {
        self.matches.snapshot(match_id).await
    }

    pub async fn view(&self, match_id: &str, player: PlayerId) -> ChkobbaResult<GameView> {
        self.matches.view(match_id, player).await
    }

    pub async fn subscribe(
        &self,
        match_id: &str,
        subscriber_id: &str,
    ) -> ChkobbaResult<mpsc::Receiver<StateChangeNotification>> {
        self.matches.subscribe(match_id, subscriber_id).await
    }

    pub async fn unsubscribe(&self, match_id: &str, subscriber_id: &str) -> ChkobbaResult<()> {
        self.matches.unsubscribe(match_id, subscriber_id).await
    }

    /// Retires a match: stops its actor and releases bookkeeping. Finished
    /// matches are settled; abandoned ones return no settlement.
    pub async fn complete_match(&self, match_id: &str) -> ChkobbaResult<Option<Vec<Settlement>>> {
        let final_state = self.matches.close_match(match_id).await?;
        self.matchmaker.lock().await.complete_match(match_id);
        self.assignments
            .write()
            .await
            .retain(|_, assigned| assigned != match_id);

        if final_state.status == Phase::MatchEnd {
            self.policy.settle(&final_state).map(Some)
        } else {
            log::info!("Match {match_id} abandoned during {}", final_state.status);
            Ok(None)
        }
    }

    pub async fn get_match(&self, match_id: &str) -> ChkobbaResult<Match> {
        self.matchmaker
            .lock()
            .await
            .get_match(match_id)
            .cloned()
            .ok_or_else(|| ChkobbaError::MatchNotFound(match_id.to_string()))
    }

    /// The match a human player is currently seated in.
    pub async fn match_for_player(&self, player: &PlayerId) -> Option<Match> {
        let match_id = self.assignments.read().await.get(player).cloned()?;
        self.matchmaker.lock().await.get_match(&match_id).cloned()
    }

    pub async fn active_matches(&self) -> usize {
        self.matches.match_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn lobby() -> Lobby {
        Lobby::new(LobbyConfig {
            fallback_think_ms: 3_600_000,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_enqueue_rejects_invalid_stake() {
        let err = lobby()
            .enqueue(PlayerId::new("alice"), 7, GameMode::OneVsOne)
            .await
            .unwrap_err();
        assert_eq!(err, ChkobbaError::InvalidStake(7));
    }

    #[tokio::test]
    async fn test_enqueue_and_dequeue() {
        let lobby = lobby();
        lobby
            .enqueue(PlayerId::new("alice"), 5, GameMode::OneVsOne)
            .await
            .unwrap();
        assert_eq!(lobby.queue_size(5, GameMode::OneVsOne).await, 1);
        assert!(lobby.is_queued(&PlayerId::new("alice"), 5, GameMode::OneVsOne).await);
        assert!(!lobby.is_queued(&PlayerId::new("alice"), 5, GameMode::TwoVsTwo).await);
        assert!(lobby.dequeue(&PlayerId::new("alice"), 5, GameMode::OneVsOne).await);
        assert_eq!(lobby.queue_size(5, GameMode::OneVsOne).await, 0);
        assert!(!lobby.is_queued(&PlayerId::new("alice"), 5, GameMode::OneVsOne).await);
    }

    #[tokio::test]
    async fn test_enqueue_triggers_pass_for_bucket() {
        let lobby = lobby();
        let t0 = Utc::now();
        lobby
            .enqueue_at(PlayerId::new("alice"), 3, GameMode::OneVsOne, t0)
            .await
            .unwrap();
        // bob arrives after alice's entry expired: alice gets a fallback match
        lobby
            .enqueue_at(
                PlayerId::new("bob"),
                3,
                GameMode::OneVsOne,
                t0 + TimeDelta::seconds(31),
            )
            .await
            .unwrap();

        let m = lobby.match_for_player(&PlayerId::new("alice")).await.unwrap();
        assert!(m.has_fallback);
        assert_eq!(lobby.queue_size(3, GameMode::OneVsOne).await, 1);
        let state = lobby.snapshot(&m.id).await.unwrap();
        assert_eq!(state.status, Phase::Playing);
    }

    #[tokio::test]
    async fn test_matching_pass_starts_human_match() {
        let lobby = lobby();
        let t0 = Utc::now();
        for name in ["alice", "bob"] {
            lobby
                .enqueue_at(PlayerId::new(name), 1, GameMode::OneVsOne, t0)
                .await
                .unwrap();
        }
        let formed = lobby
            .run_matching_pass_at(t0 + TimeDelta::seconds(20))
            .await;
        assert_eq!(formed.len(), 1);
        assert!(!formed[0].has_fallback);
        assert_eq!(lobby.active_matches().await, 1);

        let view = lobby
            .view(&formed[0].id, PlayerId::new("bob"))
            .await
            .unwrap();
        assert_eq!(view.players.len(), 2);
        assert_eq!(view.current_player, PlayerId::new("alice"));
    }

    #[tokio::test]
    async fn test_fallback_prefixed_humans_rejected() {
        let lobby = lobby();
        let t0 = Utc::now();
        let err = lobby
            .enqueue_at(PlayerId::new("bot-human"), 5, GameMode::OneVsOne, t0)
            .await
            .unwrap_err();
        assert_eq!(err, ChkobbaError::ReservedPlayerId(PlayerId::new("bot-human")));
        assert_eq!(lobby.queue_size(5, GameMode::OneVsOne).await, 0);

        let err = lobby
            .create_match(
                GameMode::OneVsOne,
                5,
                vec![PlayerId::new("alice"), PlayerId::new("bot-human")],
            )
            .await
            .unwrap_err();
        assert_eq!(err, ChkobbaError::ReservedPlayerId(PlayerId::new("bot-human")));
        assert_eq!(lobby.active_matches().await, 0);
        assert!(lobby.match_for_player(&PlayerId::new("alice")).await.is_none());
    }

    #[tokio::test]
    async fn test_seated_player_cannot_join_again() {
        let lobby = lobby();
        let t0 = Utc::now();
        let alice = PlayerId::new("alice");
        lobby
            .enqueue_at(alice.clone(), 1, GameMode::OneVsOne, t0)
            .await
            .unwrap();
        let formed = lobby.run_matching_pass_at(t0 + TimeDelta::seconds(30)).await;
        assert_eq!(formed.len(), 1);

        let err = lobby
            .enqueue_at(alice.clone(), 5, GameMode::TwoVsTwo, t0 + TimeDelta::seconds(31))
            .await
            .unwrap_err();
        assert_eq!(err, ChkobbaError::AlreadySeated(alice.clone()));
        let err = lobby
            .create_match(GameMode::OneVsOne, 1, vec![alice.clone(), PlayerId::new("bob")])
            .await
            .unwrap_err();
        assert_eq!(err, ChkobbaError::AlreadySeated(alice.clone()));
        assert_eq!(
            lobby.match_for_player(&alice).await.map(|m| m.id),
            Some(formed[0].id.clone())
        );

        // retiring the match frees the player
        lobby.complete_match(&formed[0].id).await.unwrap();
        assert!(
            lobby
                .enqueue_at(alice, 5, GameMode::TwoVsTwo, t0 + TimeDelta::seconds(32))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_failed_create_releases_players() {
        let lobby = lobby();
        let alice = PlayerId::new("alice");
        let err = lobby
            .create_match(GameMode::TwoVsTwo, 1, vec![alice.clone(), PlayerId::new("bob")])
            .await
            .unwrap_err();
        assert!(matches!(err, ChkobbaError::InvalidParticipants { .. }));
        assert!(lobby.match_for_player(&alice).await.is_none());
        assert!(lobby.enqueue(alice, 1, GameMode::OneVsOne).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_match_with_fallbacks_fills_open_seats() {
        let lobby = lobby();
        let m = lobby
            .create_match_with_fallbacks(GameMode::TwoVsTwo, 3, vec![PlayerId::new("alice")])
            .await
            .unwrap();
        assert_eq!(m.seats.len(), 4);
        assert_eq!(m.human_ids(), vec![PlayerId::new("alice")]);
        assert_eq!(m.fallback_ids().len(), 3);
        assert!(m.has_fallback);
    }

    #[tokio::test]
    async fn test_oversized_waits_do_not_panic() {
        let lobby = Lobby::new(LobbyConfig {
            queue_max_wait_secs: 100_000_000_000_000_000,
            ..Default::default()
        });
        assert!(
            lobby
                .enqueue(PlayerId::new("alice"), 1, GameMode::OneVsOne)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_create_deal_and_complete_abandoned_match() {
        let lobby = lobby();
        let m = lobby
            .create_match(
                GameMode::OneVsOne,
                10,
                vec![PlayerId::new("alice"), PlayerId::new("bob")],
            )
            .await
            .unwrap();
        lobby.deal(&m.id).await.unwrap();
        assert_eq!(lobby.get_match(&m.id).await.unwrap(), m);

        let settlement = lobby.complete_match(&m.id).await.unwrap();
        assert!(settlement.is_none());
        assert!(lobby.get_match(&m.id).await.is_err());
        assert!(lobby.match_for_player(&PlayerId::new("alice")).await.is_none());
        assert!(matches!(
            lobby.snapshot(&m.id).await,
            Err(ChkobbaError::MatchNotFound(_))
        ));
    }
}
