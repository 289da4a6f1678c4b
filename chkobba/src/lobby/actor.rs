//! Match actor: one engine per task, messages handled one at a time.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::{
    sync::mpsc,
    time::{Duration, MissedTickBehavior, interval},
};

use super::{
    config::LobbyConfig,
    messages::{MatchMessage, MoveOutcome, NotificationKind, StateChangeNotification},
};
use crate::{
    bot::{FallbackPlayer, is_fallback_id},
    errors::{ChkobbaError, ChkobbaResult},
    game::{ChkobbaEngine, Move, Phase, PlayerId, TurnOutcome},
};

/// Match actor handle for sending messages
#[derive(Clone, Debug)]
pub struct MatchHandle {
    sender: mpsc::Sender<MatchMessage>,
    match_id: String,
}

impl MatchHandle {
    pub fn new(sender: mpsc::Sender<MatchMessage>, match_id: String) -> Self {
        Self { sender, match_id }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    /// Send a message to the match
    pub async fn send(&self, message: MatchMessage) -> ChkobbaResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| ChkobbaError::MatchClosed(self.match_id.clone()))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Actor owning a single match engine
pub struct MatchActor {
    engine: ChkobbaEngine,

    inbox: mpsc::Receiver<MatchMessage>,

    /// Seated fallback players by id
    fallbacks: HashMap<PlayerId, FallbackPlayer>,

    /// Subscribers for state change notifications
    subscribers: HashMap<String, mpsc::Sender<StateChangeNotification>>,

    fallback_think: Duration,

    is_closed: bool,
}

impl MatchActor {
    /// Create a new match actor around an undealt engine.
    pub fn new(engine: ChkobbaEngine, config: &LobbyConfig) -> (Self, MatchHandle) {
        let (sender, inbox) = mpsc::channel(config.inbox_size);
        let staked = engine.state().stake > 0;
        let fallbacks = engine
            .participants()
            .into_iter()
            .filter(is_fallback_id)
            .map(|id| (id.clone(), FallbackPlayer::new(id, staked)))
            .collect();
        let handle = MatchHandle::new(sender, engine.match_id().to_string());

        let actor = Self {
            engine,
            inbox,
            fallbacks,
            subscribers: HashMap::new(),
            fallback_think: Duration::from_millis(config.fallback_think_ms),
            is_closed: false,
        };
        (actor, handle)
    }

    /// Run the match actor event loop
    pub async fn run(mut self) {
        let match_id = self.engine.match_id().to_string();
        log::info!(
            "Match {match_id} starting ({} fallback players)",
            self.fallbacks.len()
        );

        let mut tick_interval = interval(self.fallback_think);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    let Some(message) = message else {
                        // every handle dropped
                        break;
                    };
                    self.handle_message(message);
                    if self.is_closed {
                        break;
                    }
                }

                _ = tick_interval.tick() => {
                    self.tick();
                }
            }
        }

        log::info!("Match {match_id} closed");
    }

    fn handle_message(&mut self, message: MatchMessage) {
        match message {
            MatchMessage::Deal { response } => {
                let result = self.engine.deal_initial_cards().map(|()| {
                    self.notify_state_change(NotificationKind::Dealt);
                    self.engine.snapshot()
                });
                if let Err(e) = &result {
                    log::error!("Match {}: deal failed: {e}", self.engine.match_id());
                }
                let _ = response.send(result);
            }

            MatchMessage::ApplyMove {
                player_id,
                mv,
                end_turn,
                response,
            } => {
                let result = self.handle_move(&player_id, &mv, end_turn);
                let _ = response.send(result);
            }

            MatchMessage::EndTurn {
                player_id,
                response,
            } => {
                let result = self.engine.end_turn_for(&player_id).map(|outcome| {
                    self.notify_state_change(NotificationKind::from(&outcome));
                    outcome
                });
                let _ = response.send(result);
            }

            MatchMessage::GetSnapshot { response } => {
                let _ = response.send(self.engine.snapshot());
            }

            MatchMessage::GetView {
                player_id,
                response,
            } => {
                let result = if self.engine.state().player(&player_id).is_some() {
                    Ok(self.engine.view(&player_id))
                } else {
                    Err(ChkobbaError::PlayerNotInMatch(player_id))
                };
                let _ = response.send(result);
            }

            MatchMessage::Tick => {
                self.tick();
            }

            MatchMessage::Subscribe {
                subscriber_id,
                sender,
            } => {
                log::debug!(
                    "{subscriber_id} subscribed to match {} state changes",
                    self.engine.match_id()
                );
                self.subscribers.insert(subscriber_id, sender);
            }

            MatchMessage::Unsubscribe { subscriber_id } => {
                self.subscribers.remove(&subscriber_id);
                log::debug!(
                    "{subscriber_id} unsubscribed from match {} state changes",
                    self.engine.match_id()
                );
            }

            MatchMessage::Close { response } => {
                self.is_closed = true;
                self.notify_state_change(NotificationKind::Closed);
                let _ = response.send(self.engine.snapshot());
            }
        }
    }

    fn handle_move(
        &mut self,
        player_id: &PlayerId,
        mv: &Move,
        end_turn: bool,
    ) -> ChkobbaResult<MoveOutcome> {
        let record = self.engine.apply_move(player_id, mv)?;
        self.notify_state_change(NotificationKind::MoveApplied {
            record: record.clone(),
        });

        let turn = if end_turn {
            Some(self.handle_end_turn()?)
        } else {
            None
        };

        Ok(MoveOutcome {
            record,
            turn,
            state: self.engine.snapshot(),
        })
    }

    fn handle_end_turn(&mut self) -> ChkobbaResult<TurnOutcome> {
        let outcome = self.engine.end_turn()?;
        self.notify_state_change(NotificationKind::from(&outcome));
        Ok(outcome)
    }

    /// Plays one fallback turn if a fallback is to act.
    fn tick(&mut self) {
        if self.is_closed || self.engine.status() != Phase::Playing {
            return;
        }
        let current = self.engine.current_player().clone();
        let Some(fallback) = self.fallbacks.get(&current) else {
            return;
        };

        match fallback.choose_move(&self.engine) {
            Some(mv) => {
                if let Err(e) = self.handle_move(&current, &mv, true) {
                    log::error!(
                        "Match {}: fallback {current} move rejected: {e}",
                        self.engine.match_id()
                    );
                }
            }
            None => {
                log::debug!("Fallback {current} has no cards, passing");
                if let Err(e) = self.handle_end_turn() {
                    log::error!("Match {}: {e}", self.engine.match_id());
                }
            }
        }
    }

    /// Broadcast state change notification to all subscribers
    fn notify_state_change(&mut self, kind: NotificationKind) {
        if self.subscribers.is_empty() {
            return;
        }
        let notification = StateChangeNotification {
            kind,
            state: Arc::new(self.engine.snapshot()),
        };
        self.subscribers
            .retain(|subscriber_id, sender| match sender.try_send(notification.clone()) {
                Ok(_) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("Subscriber {subscriber_id} channel full, dropping notification");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("Subscriber {subscriber_id} disconnected, removing");
                    false
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{CardId, GameMode, GameState};
    use tokio::sync::oneshot;

    fn slow_config() -> LobbyConfig {
        // keep the interval out of the way so tests drive ticks by hand
        LobbyConfig {
            fallback_think_ms: 3_600_000,
            ..Default::default()
        }
    }

    fn spawn(participants: &[&str]) -> MatchHandle {
        let ids: Vec<PlayerId> = participants.iter().map(|p| PlayerId::new(p)).collect();
        let mode = if ids.len() == 2 {
            GameMode::OneVsOne
        } else {
            GameMode::TwoVsTwo
        };
        let engine = ChkobbaEngine::new("m-test", mode, 5, &ids).unwrap();
        let (actor, handle) = MatchActor::new(engine, &slow_config());
        tokio::spawn(actor.run());
        handle
    }

    async fn deal(handle: &MatchHandle) -> ChkobbaResult<GameState> {
        let (tx, rx) = oneshot::channel();
        handle.send(MatchMessage::Deal { response: tx }).await.unwrap();
        rx.await.unwrap()
    }

    async fn snapshot(handle: &MatchHandle) -> GameState {
        let (tx, rx) = oneshot::channel();
        handle
            .send(MatchMessage::GetSnapshot { response: tx })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn test_deal_then_play_a_turn() {
        let handle = spawn(&["alice", "bob"]);
        let state = deal(&handle).await.unwrap();
        assert_eq!(state.status, Phase::Playing);

        let card = state.players[0].hand[0].id();
        let (tx, rx) = oneshot::channel();
        handle
            .send(MatchMessage::ApplyMove {
                player_id: PlayerId::new("alice"),
                mv: Move::Play { card },
                end_turn: true,
                response: tx,
            })
            .await
            .unwrap();
        let outcome = rx.await.unwrap().unwrap();
        assert_eq!(outcome.turn, Some(TurnOutcome::Continued));
        assert_eq!(outcome.state.current_player(), &PlayerId::new("bob"));
    }

    #[tokio::test]
    async fn test_rejected_move_reports_error() {
        let handle = spawn(&["alice", "bob"]);
        deal(&handle).await.unwrap();

        let (tx, rx) = oneshot::channel();
        handle
            .send(MatchMessage::ApplyMove {
                player_id: PlayerId::new("bob"),
                mv: Move::Play {
                    card: CardId::from("hearts-A"),
                },
                end_turn: true,
                response: tx,
            })
            .await
            .unwrap();
        let err = rx.await.unwrap().unwrap_err();
        assert!(matches!(err, ChkobbaError::NotPlayersTurn { .. }));
    }

    #[tokio::test]
    async fn test_subscribers_receive_snapshots() {
        let handle = spawn(&["alice", "bob"]);
        let (tx, mut rx) = mpsc::channel(8);
        handle
            .send(MatchMessage::Subscribe {
                subscriber_id: "alice".to_string(),
                sender: tx,
            })
            .await
            .unwrap();
        deal(&handle).await.unwrap();

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.kind, NotificationKind::Dealt);
        assert_eq!(notification.state.status, Phase::Playing);
    }

    #[tokio::test]
    async fn test_fallback_plays_on_tick() {
        let handle = spawn(&["bot-00c0ffee", "alice"]);
        deal(&handle).await.unwrap();

        handle.send(MatchMessage::Tick).await.unwrap();
        let state = snapshot(&handle).await;
        assert_eq!(state.move_log.len(), 1);
        assert_eq!(state.move_log[0].player_id, PlayerId::new("bot-00c0ffee"));
        assert_eq!(state.current_player(), &PlayerId::new("alice"));

        // not the fallback's turn: tick does nothing
        handle.send(MatchMessage::Tick).await.unwrap();
        assert_eq!(snapshot(&handle).await.move_log.len(), 1);
    }

    #[tokio::test]
    async fn test_close_stops_actor() {
        let handle = spawn(&["alice", "bob"]);
        let (tx, rx) = oneshot::channel();
        handle.send(MatchMessage::Close { response: tx }).await.unwrap();
        let final_state = rx.await.unwrap();
        assert_eq!(final_state.match_id, "m-test");

        for _ in 0..100 {
            if handle.is_closed() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(handle.is_closed());

        let (tx, _) = oneshot::channel();
        let result = handle.send(MatchMessage::GetSnapshot { response: tx }).await;
        assert_eq!(result, Err(ChkobbaError::MatchClosed("m-test".to_string())));
    }
}
