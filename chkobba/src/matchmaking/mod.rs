//! Matchmaking orchestrator.
//!
//! Players wait in buckets keyed by (stake, mode). A matching pass seats
//! the earliest entries that have waited long enough, or pairs a single
//! expired entry with fallback players.
//!
//! The orchestrator only keeps bookkeeping. Creating and dealing the
//! engine for a formed match is the caller's job (see [`crate::lobby`]).

pub mod models;
pub mod queue;

pub use models::{Match, QueueEntry, QueueKey, Seat};
pub use queue::{
    DEFAULT_QUEUE_MAX_WAIT_SECS, DEFAULT_QUEUE_WAIT_SECS, MAX_QUEUE_WAIT_SECS, Matchmaker,
};
