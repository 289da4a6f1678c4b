use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    /// Lowercase name used inside card ids.
    pub fn name(self) -> &'static str {
        match self {
            Self::Hearts => "hearts",
            Self::Diamonds => "diamonds",
            Self::Clubs => "clubs",
            Self::Spades => "spades",
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Hearts => "♥",
            Self::Diamonds => "♦",
            Self::Clubs => "♣",
            Self::Spades => "♠",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Suit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|suit| suit.name() == s)
            .ok_or_else(|| format!("unknown suit '{s}'"))
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    #[serde(rename = "A")]
    Ace,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Capture value of the rank. Face cards all count as ten.
    pub fn value(self) -> Value {
        match self {
            Self::Ace => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Ten | Self::Jack | Self::Queen | Self::King => 10,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Ace => "A",
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
            Self::Nine => "9",
            Self::Ten => "10",
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Rank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|rank| rank.symbol() == s)
            .ok_or_else(|| format!("unknown rank '{s}'"))
    }
}

/// Point value of a card.
pub type Value = u8;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub const fn new(suit: Suit, rank: Rank) -> Self {
        Self { suit, rank }
    }

    pub fn value(&self) -> Value {
        self.rank.value()
    }

    pub fn id(&self) -> CardId {
        CardId(format!("{}-{}", self.suit.name(), self.rank.symbol()))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = format!("{}/{}", self.rank, self.suit);
        write!(f, "{repr:>4}")
    }
}

impl FromStr for Card {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (suit, rank) = s
            .split_once('-')
            .ok_or_else(|| format!("malformed card id '{s}'"))?;
        Ok(Self::new(suit.parse()?, rank.parse()?))
    }
}

/// Textual card identity, `"{suit}-{rank}"` (e.g. `spades-10`).
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Card> for CardId {
    fn from(card: Card) -> Self {
        card.id()
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

pub const DECK_SIZE: usize = 52;

/// Draw pile. Cards are drawn from the end.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// The full 52 card deck in suit-major order.
    pub fn standard() -> Self {
        let cards = Suit::ALL
            .into_iter()
            .flat_map(|suit| Rank::ALL.into_iter().map(move |rank| Card::new(suit, rank)))
            .collect();
        Self { cards }
    }

    pub fn shuffled() -> Self {
        let mut deck = Self::standard();
        deck.shuffle_with(&mut rand::rng());
        deck
    }

    /// Fisher-Yates: walk from the last index down, swapping each slot with
    /// a uniformly chosen index in `[0, i]`.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for i in (1..self.cards.len()).rev() {
            let j = rng.random_range(0..=i);
            self.cards.swap(i, j);
        }
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl From<Vec<Card>> for Deck {
    fn from(cards: Vec<Card>) -> Self {
        Self { cards }
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(s: &str) -> Self {
        Self(s.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// Seating mode of a match.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum GameMode {
    #[serde(rename = "1v1")]
    OneVsOne,
    #[serde(rename = "2v2")]
    TwoVsTwo,
}

impl GameMode {
    pub const ALL: [GameMode; 2] = [GameMode::OneVsOne, GameMode::TwoVsTwo];

    pub fn required_players(self) -> usize {
        match self {
            Self::OneVsOne => 2,
            Self::TwoVsTwo => 4,
        }
    }

    /// Team for a seat. Heads-up seats are their own team; in 2v2 seat
    /// parity alternates teams.
    pub fn team_for_seat(self, seat: usize) -> Team {
        match self {
            Self::OneVsOne if seat == 0 => Team::One,
            Self::OneVsOne => Team::Two,
            Self::TwoVsTwo if seat % 2 == 0 => Team::One,
            Self::TwoVsTwo => Team::Two,
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneVsOne => write!(f, "1v1"),
            Self::TwoVsTwo => write!(f, "2v2"),
        }
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1v1" => Ok(Self::OneVsOne),
            "2v2" => Ok(Self::TwoVsTwo),
            other => Err(format!("unknown game mode '{other}'")),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Team {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "1"),
            Self::Two => write!(f, "2"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub hand: Vec<Card>,
    pub captures: Vec<Card>,
    /// Cumulative score across finished rounds.
    pub score: u32,
    pub team: Team,
}

impl Player {
    pub fn new(id: PlayerId, seat: usize, mode: GameMode) -> Self {
        Self {
            id,
            name: format!("Player {}", seat + 1),
            hand: Vec::new(),
            captures: Vec::new(),
            score: 0,
            team: mode.team_for_seat(seat),
        }
    }

    /// Index of `card` in the hand. Malformed ids match nothing.
    pub fn hand_position(&self, card: &CardId) -> Option<usize> {
        let wanted: Card = card.as_str().parse().ok()?;
        self.hand.iter().position(|c| *c == wanted)
    }

    pub fn holds(&self, card: &CardId) -> bool {
        self.hand_position(card).is_some()
    }

    /// Clears per-round piles, keeping identity and cumulative score.
    pub fn reset(&mut self) {
        self.hand.clear();
        self.captures.clear();
    }
}

/// Match lifecycle status.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Playing,
    RoundEnd,
    MatchEnd,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Setup => "setup",
            Self::Playing => "playing",
            Self::RoundEnd => "round_end",
            Self::MatchEnd => "match_end",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveAction {
    Play,
    Capture,
    Chkobba,
}

impl fmt::Display for MoveAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Play => "plays",
            Self::Capture => "captures with",
            Self::Chkobba => "sweeps the table with",
        };
        write!(f, "{repr}")
    }
}

/// Append-only move log entry.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MoveRecord {
    pub action: MoveAction,
    pub player_id: PlayerId,
    pub timestamp: DateTime<Utc>,
    pub round: u8,
    pub card: Card,
    pub captured: Vec<Card>,
}

impl fmt::Display for MoveRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.player_id, self.action, self.card.id())?;
        if !self.captured.is_empty() {
            let captured: Vec<String> = self.captured.iter().map(|c| c.id().0).collect();
            write!(f, " taking [{}]", captured.join(", "))?;
        }
        Ok(())
    }
}

/// A move submitted by a participant.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Move {
    Play {
        card: CardId,
    },
    Capture {
        card: CardId,
        #[serde(default)]
        table_cards: Vec<CardId>,
    },
    Chkobba {
        card: CardId,
    },
}

impl Move {
    pub fn card(&self) -> &CardId {
        match self {
            Self::Play { card } | Self::Capture { card, .. } | Self::Chkobba { card } => card,
        }
    }

    pub fn action(&self) -> MoveAction {
        match self {
            Self::Play { .. } => MoveAction::Play,
            Self::Capture { .. } => MoveAction::Capture,
            Self::Chkobba { .. } => MoveAction::Chkobba,
        }
    }
}

/// What one participant may see of another.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub team: Team,
    /// Empty unless the view belongs to this player.
    pub hand: Vec<Card>,
    pub hand_size: usize,
    pub captured_count: usize,
    pub score: u32,
}
