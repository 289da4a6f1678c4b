//! Typed failures surfaced by the engine, stake policy and lobby.

use thiserror::Error;

use crate::game::entities::{CardId, GameMode, Phase, PlayerId, Value};
use crate::stake::Stake;

/// Errors returned at the core's call boundary. None of them mutate state.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ChkobbaError {
    /// Stake is not in the allow-list
    #[error("Invalid stake: {0}")]
    InvalidStake(Stake),

    /// No live engine under this match id
    #[error("Match not found: {0}")]
    MatchNotFound(String),

    /// Actor is not the player to act
    #[error("Not {player}'s turn (current player is {current})")]
    NotPlayersTurn { player: PlayerId, current: PlayerId },

    /// Referenced card is not held by the actor
    #[error("Card {card} is not in {player}'s hand")]
    CardNotInHand { player: PlayerId, card: CardId },

    /// Table subset does not sum to the played card's value
    #[error("Capture sum {sum} does not match card value {value}")]
    CaptureSumMismatch { sum: u32, value: Value },

    /// Table is empty or its total does not match the declared card
    #[error("Chkobba requires a non-empty table summing to {value} (table sums to {sum})")]
    ChkobbaPreconditionFailed { sum: u32, value: Value },

    /// Not enough cards left to deal
    #[error("Cannot deal {required} cards from a deck of {remaining}")]
    DealPreconditionFailed { required: usize, remaining: usize },

    /// Actor is not seated in this match
    #[error("Player {0} is not in this match")]
    PlayerNotInMatch(PlayerId),

    /// Operation is not allowed in the current phase
    #[error("Operation not allowed during {0}")]
    InvalidPhase(Phase),

    /// Participant list does not fit the mode
    #[error("{mode} needs {required} distinct participants, got {got}")]
    InvalidParticipants {
        mode: GameMode,
        required: usize,
        got: usize,
    },

    /// Player already waits in a queue bucket
    #[error("Player {0} is already queued")]
    AlreadyQueued(PlayerId),

    /// Player is seated in a live match
    #[error("Player {0} is already seated in a match")]
    AlreadySeated(PlayerId),

    /// Human id uses the namespace reserved for fallback players
    #[error("Player id {0} is reserved for fallback players")]
    ReservedPlayerId(PlayerId),

    /// Match actor is no longer accepting messages
    #[error("Match {0} is closed")]
    MatchClosed(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChkobbaError {
    /// Get a client-safe error message.
    ///
    /// Internal failures are collapsed to a generic message and match ids
    /// are redacted.
    pub fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::MatchNotFound(_) => "Match not found".to_string(),
            Self::MatchClosed(_) => "Match is closed".to_string(),
            // Deal failures are an invariant violation, not the caller's fault
            Self::DealPreconditionFailed { .. } => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the failure was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Internal(_) | Self::DealPreconditionFailed { .. } | Self::MatchClosed(_)
        )
    }
}

/// Result type for core operations
pub type ChkobbaResult<T> = Result<T, ChkobbaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_redacts_internal_details() {
        let err = ChkobbaError::Internal("mpsc receiver dropped".to_string());
        assert_eq!(err.client_message(), "Internal server error");

        let err = ChkobbaError::MatchNotFound("a1b2".to_string());
        assert_eq!(err.client_message(), "Match not found");
    }

    #[test]
    fn test_client_message_passes_rule_violations_through() {
        let err = ChkobbaError::CaptureSumMismatch { sum: 4, value: 5 };
        assert_eq!(err.client_message(), "Capture sum 4 does not match card value 5");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_deal_failure_is_server_side() {
        let err = ChkobbaError::DealPreconditionFailed {
            required: 10,
            remaining: 2,
        };
        assert!(!err.is_client_error());
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_reserved_id_is_client_error() {
        let err = ChkobbaError::ReservedPlayerId(PlayerId::new("bot-1234abcd"));
        assert!(err.is_client_error());
        assert_eq!(
            err.client_message(),
            "Player id bot-1234abcd is reserved for fallback players"
        );
    }
}
