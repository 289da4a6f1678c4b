//! Chkobba match state machine.
//!
//! A match moves through `setup → playing → round_end → {setup | match_end}`.
//! Every rule check runs before any mutation, so a rejected operation
//! leaves the state bit-for-bit unchanged.

use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::entities::{
    Card, CardId, DECK_SIZE, Deck, GameMode, Move, MoveAction, MoveRecord, Phase, Player,
    PlayerId, PlayerView, Rank, Suit,
};
use crate::errors::{ChkobbaError, ChkobbaResult};
use crate::stake::Stake;

/// Cards dealt to each player per deal.
pub const HAND_SIZE: usize = 3;
/// Cards laid face-up at the start of a round.
pub const TABLE_DEAL_SIZE: usize = 4;
/// Cumulative score that ends the match.
pub const WINNING_SCORE: u32 = 21;
/// Last round of a match.
pub const MAX_ROUNDS: u8 = 3;

/// Spade ranks worth a bonus point when captured.
const BONUS_SPADES: [Rank; 4] = [Rank::Ace, Rank::Two, Rank::Three, Rank::Ten];

/// Full state of one match. Cloning it yields an independent snapshot.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameState {
    pub match_id: String,
    pub mode: GameMode,
    pub stake: Stake,
    /// Players in seat order.
    pub players: Vec<Player>,
    pub table: Vec<Card>,
    pub current_player_index: usize,
    pub round: u8,
    /// Scores of the most recently finished round.
    pub round_scores: BTreeMap<PlayerId, u32>,
    pub total_scores: BTreeMap<PlayerId, u32>,
    pub move_log: Vec<MoveRecord>,
    pub status: Phase,
    pub winner: Option<PlayerId>,
    pub deck: Deck,
    /// Cards played without a capture. They never reach the table.
    pub discarded: Vec<Card>,
}

impl GameState {
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    fn player_index(&self, id: &PlayerId) -> ChkobbaResult<usize> {
        self.players
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| ChkobbaError::PlayerNotInMatch(id.clone()))
    }

    pub fn current_player(&self) -> &PlayerId {
        &self.players[self.current_player_index].id
    }

    /// Every card the state currently accounts for, wherever it sits.
    pub fn all_cards(&self) -> Vec<Card> {
        let mut cards: Vec<Card> = self
            .players
            .iter()
            .flat_map(|p| p.hand.iter().chain(p.captures.iter()))
            .copied()
            .collect();
        cards.extend_from_slice(&self.table);
        cards.extend_from_slice(self.deck.cards());
        cards.extend_from_slice(&self.discarded);
        cards
    }

    /// Whether hands, captures, table, deck and discards partition the full
    /// deck with no duplicates or omissions.
    pub fn conservation_check(&self) -> bool {
        let cards = self.all_cards();
        if cards.len() != DECK_SIZE {
            return false;
        }
        let unique: HashSet<Card> = cards.into_iter().collect();
        unique.len() == DECK_SIZE
            && Suit::ALL
                .into_iter()
                .all(|s| Rank::ALL.into_iter().all(|r| unique.contains(&Card::new(s, r))))
    }

    fn hands_empty(&self) -> bool {
        self.players.iter().all(|p| p.hand.is_empty())
    }
}

/// Redacted per-player view for broadcasting.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GameView {
    pub match_id: String,
    pub viewer: PlayerId,
    pub mode: GameMode,
    pub stake: Stake,
    pub status: Phase,
    pub round: u8,
    pub table: Vec<Card>,
    pub current_player: PlayerId,
    pub players: Vec<PlayerView>,
    pub round_scores: BTreeMap<PlayerId, u32>,
    pub total_scores: BTreeMap<PlayerId, u32>,
    pub winner: Option<PlayerId>,
    pub deck_size: usize,
    pub last_move: Option<MoveRecord>,
}

/// What `end_turn` did besides rotating the acting seat.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Play continues with the next seat.
    Continued,
    /// Hands ran dry and fresh cards were dealt from the deck.
    Redealt,
    /// A round was scored and the next one dealt.
    RoundEnded { round: u8 },
    /// The final round was scored.
    MatchEnded { winner: PlayerId },
}

/// Rule engine owning one match's state.
#[derive(Debug)]
pub struct ChkobbaEngine {
    state: GameState,
}

impl ChkobbaEngine {
    /// Creates a match in `setup` with a freshly shuffled deck.
    pub fn new(
        match_id: &str,
        mode: GameMode,
        stake: Stake,
        participants: &[PlayerId],
    ) -> ChkobbaResult<Self> {
        Self::with_deck(match_id, mode, stake, participants, Deck::shuffled())
    }

    /// Creates a match in `setup` drawing its first round from `deck`.
    pub fn with_deck(
        match_id: &str,
        mode: GameMode,
        stake: Stake,
        participants: &[PlayerId],
        deck: Deck,
    ) -> ChkobbaResult<Self> {
        let required = mode.required_players();
        let distinct: HashSet<&PlayerId> = participants.iter().collect();
        if participants.len() != required || distinct.len() != required {
            return Err(ChkobbaError::InvalidParticipants {
                mode,
                required,
                got: distinct.len(),
            });
        }

        let players: Vec<Player> = participants
            .iter()
            .enumerate()
            .map(|(seat, id)| Player::new(id.clone(), seat, mode))
            .collect();
        let zeroes: BTreeMap<PlayerId, u32> =
            participants.iter().map(|id| (id.clone(), 0)).collect();

        Ok(Self {
            state: GameState {
                match_id: match_id.to_string(),
                mode,
                stake,
                players,
                table: Vec::new(),
                current_player_index: 0,
                round: 1,
                round_scores: zeroes.clone(),
                total_scores: zeroes,
                move_log: Vec::new(),
                status: Phase::Setup,
                winner: None,
                deck,
                discarded: Vec::new(),
            },
        })
    }

    /// Restores an engine from a snapshot, checking its structural invariants.
    pub fn from_state(state: GameState) -> ChkobbaResult<Self> {
        let required = state.mode.required_players();
        if state.players.len() != required {
            return Err(ChkobbaError::InvalidParticipants {
                mode: state.mode,
                required,
                got: state.players.len(),
            });
        }
        if state.current_player_index >= state.players.len() {
            return Err(ChkobbaError::Internal(format!(
                "player index {} out of bounds",
                state.current_player_index
            )));
        }
        if !state.conservation_check() {
            return Err(ChkobbaError::Internal(
                "snapshot does not account for every card exactly once".to_string(),
            ));
        }
        Ok(Self { state })
    }

    /// Deals three cards to each player in seat order, then four to the
    /// table, all from the deck's end.
    pub fn deal_initial_cards(&mut self) -> ChkobbaResult<()> {
        if self.state.status != Phase::Setup {
            return Err(ChkobbaError::InvalidPhase(self.state.status));
        }
        let required = HAND_SIZE * self.state.players.len() + TABLE_DEAL_SIZE;
        let remaining = self.state.deck.len();
        if remaining < required {
            return Err(ChkobbaError::DealPreconditionFailed {
                required,
                remaining,
            });
        }

        self.deal_hands();
        for _ in 0..TABLE_DEAL_SIZE {
            if let Some(card) = self.state.deck.draw() {
                self.state.table.push(card);
            }
        }
        self.state.status = Phase::Playing;
        debug!(
            "match {} round {} dealt, {} cards left",
            self.state.match_id,
            self.state.round,
            self.state.deck.len()
        );
        Ok(())
    }

    /// Up to `HAND_SIZE` cards to each player in seat order, one seat's
    /// cards drawn back to back before the next seat's.
    fn deal_hands(&mut self) {
        for player in self.state.players.iter_mut() {
            for _ in 0..HAND_SIZE {
                if let Some(card) = self.state.deck.draw() {
                    player.hand.push(card);
                }
            }
        }
    }

    fn locate(&self, player: &PlayerId, card: &CardId) -> ChkobbaResult<(usize, usize)> {
        let idx = self.state.player_index(player)?;
        let pos = self.state.players[idx].hand_position(card).ok_or_else(|| {
            ChkobbaError::CardNotInHand {
                player: player.clone(),
                card: card.clone(),
            }
        })?;
        Ok((idx, pos))
    }

    fn record(&mut self, action: MoveAction, player: &PlayerId, card: Card, captured: Vec<Card>) {
        let entry = MoveRecord {
            action,
            player_id: player.clone(),
            timestamp: Utc::now(),
            round: self.state.round,
            card,
            captured,
        };
        debug!("match {}: {entry}", self.state.match_id);
        self.state.move_log.push(entry);
    }

    /// Removes `card` from the player's hand without capturing anything.
    pub fn play_card(&mut self, player: &PlayerId, card: &CardId) -> ChkobbaResult<Card> {
        let (idx, pos) = self.locate(player, card)?;
        let played = self.state.players[idx].hand.remove(pos);
        self.state.discarded.push(played);
        self.record(MoveAction::Play, player, played, Vec::new());
        Ok(played)
    }

    /// Captures the table cards named in `table_cards` with `card`.
    ///
    /// Ids that are not on the table are ignored. Any subset whose values
    /// sum to the card's value is accepted.
    pub fn capture_cards(
        &mut self,
        player: &PlayerId,
        card: &CardId,
        table_cards: &[CardId],
    ) -> ChkobbaResult<Vec<Card>> {
        let (idx, pos) = self.locate(player, card)?;
        let played = self.state.players[idx].hand[pos];

        let wanted: HashSet<&CardId> = table_cards.iter().collect();
        let selected: Vec<Card> = self
            .state
            .table
            .iter()
            .filter(|c| wanted.contains(&c.id()))
            .copied()
            .collect();
        let sum = card_sum(&selected);
        if sum != u32::from(played.value()) {
            return Err(ChkobbaError::CaptureSumMismatch {
                sum,
                value: played.value(),
            });
        }

        self.state.table.retain(|c| !selected.contains(c));
        let hand_owner = &mut self.state.players[idx];
        hand_owner.hand.remove(pos);
        hand_owner.captures.push(played);
        hand_owner.captures.extend_from_slice(&selected);
        self.record(MoveAction::Capture, player, played, selected.clone());
        Ok(selected)
    }

    /// Sweeps the whole table with `card` when the table sums to its value.
    pub fn declare_chkobba(&mut self, player: &PlayerId, card: &CardId) -> ChkobbaResult<Vec<Card>> {
        let (idx, pos) = self.locate(player, card)?;
        let played = self.state.players[idx].hand[pos];
        let sum = card_sum(&self.state.table);
        if self.state.table.is_empty() || sum != u32::from(played.value()) {
            return Err(ChkobbaError::ChkobbaPreconditionFailed {
                sum,
                value: played.value(),
            });
        }

        let swept = std::mem::take(&mut self.state.table);
        let hand_owner = &mut self.state.players[idx];
        hand_owner.hand.remove(pos);
        hand_owner.captures.push(played);
        hand_owner.captures.extend_from_slice(&swept);
        info!(
            "match {}: {player} declares chkobba with {}",
            self.state.match_id,
            played.id()
        );
        self.record(MoveAction::Chkobba, player, played, swept.clone());
        Ok(swept)
    }

    /// Checked entry point for a participant's move: the match must be in
    /// play and it must be the actor's turn.
    pub fn apply_move(&mut self, player: &PlayerId, mv: &Move) -> ChkobbaResult<MoveRecord> {
        if self.state.status != Phase::Playing {
            return Err(ChkobbaError::InvalidPhase(self.state.status));
        }
        self.state.player_index(player)?;
        let current = self.state.current_player();
        if current != player {
            return Err(ChkobbaError::NotPlayersTurn {
                player: player.clone(),
                current: current.clone(),
            });
        }

        match mv {
            Move::Play { card } => {
                self.play_card(player, card)?;
            }
            Move::Capture { card, table_cards } => {
                self.capture_cards(player, card, table_cards)?;
            }
            Move::Chkobba { card } => {
                self.declare_chkobba(player, card)?;
            }
        }
        self.state
            .move_log
            .last()
            .cloned()
            .ok_or_else(|| ChkobbaError::Internal("move log empty after a move".to_string()))
    }

    /// Checked pass for a participant: like [`Self::apply_move`], the match
    /// must be in play and it must be `player`'s turn.
    pub fn end_turn_for(&mut self, player: &PlayerId) -> ChkobbaResult<TurnOutcome> {
        if self.state.status != Phase::Playing {
            return Err(ChkobbaError::InvalidPhase(self.state.status));
        }
        self.state.player_index(player)?;
        let current = self.state.current_player();
        if current != player {
            return Err(ChkobbaError::NotPlayersTurn {
                player: player.clone(),
                current: current.clone(),
            });
        }
        self.end_turn()
    }

    /// Passes the turn to the next seat. Re-deals when every hand is empty
    /// and cards remain; scores the round when the deck is empty too.
    pub fn end_turn(&mut self) -> ChkobbaResult<TurnOutcome> {
        if self.state.status != Phase::Playing {
            return Err(ChkobbaError::InvalidPhase(self.state.status));
        }
        let n = self.state.players.len();
        self.state.current_player_index = (self.state.current_player_index + 1) % n;

        if !self.state.hands_empty() {
            return Ok(TurnOutcome::Continued);
        }
        if !self.state.deck.is_empty() {
            self.deal_hands();
            debug!(
                "match {} re-dealt, {} cards left",
                self.state.match_id,
                self.state.deck.len()
            );
            return Ok(TurnOutcome::Redealt);
        }
        self.end_round()
    }

    fn end_round(&mut self) -> ChkobbaResult<TurnOutcome> {
        self.state.status = Phase::RoundEnd;
        self.calculate_round_scores();
        let finished = self.state.round;
        info!(
            "match {} round {finished} scored: {:?}",
            self.state.match_id, self.state.round_scores
        );

        let best = self.state.total_scores.values().copied().max().unwrap_or(0);
        if best >= WINNING_SCORE || finished >= MAX_ROUNDS {
            let winner = self.end_match();
            return Ok(TurnOutcome::MatchEnded { winner });
        }

        self.state.round += 1;
        self.reset_round();
        self.deal_initial_cards()?;
        Ok(TurnOutcome::RoundEnded { round: finished })
    }

    fn calculate_round_scores(&mut self) {
        let round = self.state.round;
        let sweepers: HashSet<&PlayerId> = self
            .state
            .move_log
            .iter()
            .filter(|m| m.action == MoveAction::Chkobba && m.round == round)
            .map(|m| &m.player_id)
            .collect();

        let mut round_scores = BTreeMap::new();
        for player in &self.state.players {
            let bonus_spades = player
                .captures
                .iter()
                .filter(|c| c.suit == Suit::Spades && BONUS_SPADES.contains(&c.rank))
                .count();
            let chkobba_bonus = usize::from(sweepers.contains(&player.id));
            let score = (player.captures.len() + bonus_spades + chkobba_bonus) as u32;
            round_scores.insert(player.id.clone(), score);
        }

        for player in self.state.players.iter_mut() {
            let gained = round_scores.get(&player.id).copied().unwrap_or(0);
            let total = self.state.total_scores.entry(player.id.clone()).or_insert(0);
            *total += gained;
            player.score = *total;
        }
        self.state.round_scores = round_scores;
    }

    /// Names the winner: strictly greatest total, first seat on ties.
    fn end_match(&mut self) -> PlayerId {
        let mut winner = &self.state.players[0].id;
        let mut best = self.state.total_scores.get(winner).copied().unwrap_or(0);
        for player in &self.state.players[1..] {
            let total = self.state.total_scores.get(&player.id).copied().unwrap_or(0);
            if total > best {
                best = total;
                winner = &player.id;
            }
        }
        let winner = winner.clone();
        info!(
            "match {} ended after round {}: {winner} wins with {best}",
            self.state.match_id, self.state.round
        );
        self.state.status = Phase::MatchEnd;
        self.state.winner = Some(winner.clone());
        winner
    }

    fn reset_round(&mut self) {
        for player in self.state.players.iter_mut() {
            player.reset();
        }
        self.state.table.clear();
        self.state.discarded.clear();
        self.state.current_player_index = 0;
        self.state.deck = Deck::shuffled();
        self.state.status = Phase::Setup;
    }

    // === Accessors ===

    /// Independent deep copy of the full state.
    pub fn snapshot(&self) -> GameState {
        self.state.clone()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn match_id(&self) -> &str {
        &self.state.match_id
    }

    pub fn status(&self) -> Phase {
        self.state.status
    }

    pub fn hand(&self, player: &PlayerId) -> Option<&[Card]> {
        self.state.player(player).map(|p| p.hand.as_slice())
    }

    pub fn table(&self) -> &[Card] {
        &self.state.table
    }

    pub fn current_player(&self) -> &PlayerId {
        self.state.current_player()
    }

    pub fn scores(&self) -> &BTreeMap<PlayerId, u32> {
        &self.state.total_scores
    }

    pub fn winner(&self) -> Option<&PlayerId> {
        self.state.winner.as_ref()
    }

    pub fn participants(&self) -> Vec<PlayerId> {
        self.state.players.iter().map(|p| p.id.clone()).collect()
    }

    /// Pre-flight check: whether `card` is currently in `player`'s hand.
    pub fn validate_move(&self, player: &PlayerId, card: &CardId) -> bool {
        self.state
            .player(player)
            .is_some_and(|p| p.holds(card))
    }

    pub fn conservation_check(&self) -> bool {
        self.state.conservation_check()
    }

    /// View of the match as `viewer` may see it: only their own hand.
    pub fn view(&self, viewer: &PlayerId) -> GameView {
        let players = self
            .state
            .players
            .iter()
            .map(|p| PlayerView {
                id: p.id.clone(),
                name: p.name.clone(),
                team: p.team,
                hand: if &p.id == viewer {
                    p.hand.clone()
                } else {
                    Vec::new()
                },
                hand_size: p.hand.len(),
                captured_count: p.captures.len(),
                score: p.score,
            })
            .collect();

        GameView {
            match_id: self.state.match_id.clone(),
            viewer: viewer.clone(),
            mode: self.state.mode,
            stake: self.state.stake,
            status: self.state.status,
            round: self.state.round,
            table: self.state.table.clone(),
            current_player: self.state.current_player().clone(),
            players,
            round_scores: self.state.round_scores.clone(),
            total_scores: self.state.total_scores.clone(),
            winner: self.state.winner.clone(),
            deck_size: self.state.deck.len(),
            last_move: self.state.move_log.last().cloned(),
        }
    }
}

fn card_sum(cards: &[Card]) -> u32 {
    cards.iter().map(|c| u32::from(c.value())).sum()
}
