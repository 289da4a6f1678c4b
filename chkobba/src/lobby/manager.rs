//! Match manager: registry of live match actors.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::{RwLock, mpsc, oneshot};

use super::{
    actor::{MatchActor, MatchHandle},
    config::LobbyConfig,
    messages::{MatchMessage, MoveOutcome, StateChangeNotification},
};
use crate::{
    errors::{ChkobbaError, ChkobbaResult},
    game::{ChkobbaEngine, GameMode, GameState, GameView, Move, PlayerId, TurnOutcome},
    stake::Stake,
};

/// Match manager for spawning and addressing match actors
pub struct MatchManager {
    config: LobbyConfig,

    /// Active match handles
    matches: Arc<RwLock<HashMap<String, MatchHandle>>>,
}

impl MatchManager {
    pub fn new(config: LobbyConfig) -> Self {
        Self {
            config,
            matches: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create an engine for the participants and spawn its actor. The
    /// match stays in `setup` until it is dealt.
    pub async fn create_match(
        &self,
        match_id: &str,
        mode: GameMode,
        stake: Stake,
        participants: &[PlayerId],
    ) -> ChkobbaResult<()> {
        let engine = ChkobbaEngine::new(match_id, mode, stake, participants)?;

        let mut matches = self.matches.write().await;
        if matches.contains_key(match_id) {
            return Err(ChkobbaError::Internal(format!(
                "match {match_id} already exists"
            )));
        }
        let (actor, handle) = MatchActor::new(engine, &self.config);
        matches.insert(match_id.to_string(), handle);
        drop(matches);

        tokio::spawn(async move {
            actor.run().await;
        });
        log::info!("Created match {match_id} ({mode}, stake {stake})");
        Ok(())
    }

    /// Get match handle
    pub async fn get_match(&self, match_id: &str) -> ChkobbaResult<MatchHandle> {
        self.matches
            .read()
            .await
            .get(match_id)
            .cloned()
            .ok_or_else(|| ChkobbaError::MatchNotFound(match_id.to_string()))
    }

    pub async fn deal(&self, match_id: &str) -> ChkobbaResult<GameState> {
        let handle = self.get_match(match_id).await?;
        let (tx, rx) = oneshot::channel();
        handle.send(MatchMessage::Deal { response: tx }).await?;
        Self::receive(match_id, rx).await?
    }

    pub async fn apply_move(
        &self,
        match_id: &str,
        player_id: PlayerId,
        mv: Move,
        end_turn: bool,
    ) -> ChkobbaResult<MoveOutcome> {
        let handle = self.get_match(match_id).await?;
        let (tx, rx) = oneshot::channel();
        handle
            .send(MatchMessage::ApplyMove {
                player_id,
                mv,
                end_turn,
                response: tx,
            })
            .await?;
        Self::receive(match_id, rx).await?
    }

    pub async fn end_turn(
        &self,
        match_id: &str,
        player_id: PlayerId,
    ) -> ChkobbaResult<TurnOutcome> {
        let handle = self.get_match(match_id).await?;
        let (tx, rx) = oneshot::channel();
        handle
            .send(MatchMessage::EndTurn {
                player_id,
                response: tx,
            })
            .await?;
        Self::receive(match_id, rx).await?
    }

    pub async fn snapshot(&self, match_id: &str) -> ChkobbaResult<GameState> {
        let handle = self.get_match(match_id).await?;
        let (tx, rx) = oneshot::channel();
        handle
            .send(MatchMessage::GetSnapshot { response: tx })
            .await?;
        Self::receive(match_id, rx).await
    }

    pub async fn view(&self, match_id: &str, player_id: PlayerId) -> ChkobbaResult<GameView> {
        let handle = self.get_match(match_id).await?;
        let (tx, rx) = oneshot::channel();
        handle
            .send(MatchMessage::GetView {
                player_id,
                response: tx,
            })
            .await?;
        Self::receive(match_id, rx).await?
    }

    /// Subscribe to state changes of a match.
    pub async fn subscribe(
        &self,
        match_id: &str,
        subscriber_id: &str,
    ) -> ChkobbaResult<mpsc::Receiver<StateChangeNotification>> {
        let handle = self.get_match(match_id).await?;
        let (tx, rx) = mpsc::channel(self.config.subscriber_buffer);
        handle
            .send(MatchMessage::Subscribe {
                subscriber_id: subscriber_id.to_string(),
                sender: tx,
            })
            .await?;
        Ok(rx)
    }

    pub async fn unsubscribe(&self, match_id: &str, subscriber_id: &str) -> ChkobbaResult<()> {
        let handle = self.get_match(match_id).await?;
        handle
            .send(MatchMessage::Unsubscribe {
                subscriber_id: subscriber_id.to_string(),
            })
            .await
    }

    /// Ask a match to drive its fallback players once.
    pub async fn tick(&self, match_id: &str) -> ChkobbaResult<()> {
        self.get_match(match_id).await?.send(MatchMessage::Tick).await
    }

    /// Stop the actor and drop it from the registry. Returns the final state.
    pub async fn close_match(&self, match_id: &str) -> ChkobbaResult<GameState> {
        let handle = self
            .matches
            .write()
            .await
            .remove(match_id)
            .ok_or_else(|| ChkobbaError::MatchNotFound(match_id.to_string()))?;

        let (tx, rx) = oneshot::channel();
        handle.send(MatchMessage::Close { response: tx }).await?;
        let final_state = Self::receive(match_id, rx).await?;
        log::info!("Closed match {match_id}");
        Ok(final_state)
    }

    pub async fn match_ids(&self) -> Vec<String> {
        self.matches.read().await.keys().cloned().collect()
    }

    pub async fn match_count(&self) -> usize {
        self.matches.read().await.len()
    }

    async fn receive<T>(match_id: &str, rx: oneshot::Receiver<T>) -> ChkobbaResult<T> {
        rx.await
            .map_err(|_| ChkobbaError::MatchClosed(match_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Phase;

    fn ids(names: &[&str]) -> Vec<PlayerId> {
        names.iter().map(|n| PlayerId::new(n)).collect()
    }

    #[tokio::test]
    async fn test_create_and_deal() {
        let manager = MatchManager::new(LobbyConfig::default());
        manager
            .create_match("m1", GameMode::OneVsOne, 5, &ids(&["a", "b"]))
            .await
            .unwrap();
        assert_eq!(manager.match_count().await, 1);

        let before = manager.snapshot("m1").await.unwrap();
        assert_eq!(before.status, Phase::Setup);

        let dealt = manager.deal("m1").await.unwrap();
        assert_eq!(dealt.status, Phase::Playing);
        assert_eq!(dealt.table.len(), 4);
    }

    #[tokio::test]
    async fn test_duplicate_match_id_rejected() {
        let manager = MatchManager::new(LobbyConfig::default());
        let players = ids(&["a", "b"]);
        manager
            .create_match("m1", GameMode::OneVsOne, 5, &players)
            .await
            .unwrap();
        let err = manager
            .create_match("m1", GameMode::OneVsOne, 5, &players)
            .await
            .unwrap_err();
        assert!(matches!(err, ChkobbaError::Internal(_)));
    }

    #[tokio::test]
    async fn test_unknown_match() {
        let manager = MatchManager::new(LobbyConfig::default());
        assert_eq!(
            manager.snapshot("nope").await.unwrap_err(),
            ChkobbaError::MatchNotFound("nope".to_string())
        );
    }

    #[tokio::test]
    async fn test_view_for_outsider_fails() {
        let manager = MatchManager::new(LobbyConfig::default());
        manager
            .create_match("m1", GameMode::OneVsOne, 5, &ids(&["a", "b"]))
            .await
            .unwrap();
        let err = manager.view("m1", PlayerId::new("z")).await.unwrap_err();
        assert_eq!(err, ChkobbaError::PlayerNotInMatch(PlayerId::new("z")));
    }

    #[tokio::test]
    async fn test_close_removes_match() {
        let manager = MatchManager::new(LobbyConfig::default());
        manager
            .create_match("m1", GameMode::OneVsOne, 5, &ids(&["a", "b"]))
            .await
            .unwrap();
        let final_state = manager.close_match("m1").await.unwrap();
        assert_eq!(final_state.match_id, "m1");
        assert_eq!(manager.match_count().await, 0);
        assert!(manager.close_match("m1").await.is_err());
    }
}
