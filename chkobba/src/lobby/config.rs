//! Lobby configuration models.

use serde::{Deserialize, Serialize};

use crate::matchmaking::{
    DEFAULT_QUEUE_MAX_WAIT_SECS, DEFAULT_QUEUE_WAIT_SECS, MAX_QUEUE_WAIT_SECS,
};
use crate::stake::{DEFAULT_VALID_STAKES, Stake};

/// Lobby configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Allowed stake amounts
    pub valid_stakes: Vec<Stake>,

    /// Seconds an entry waits before it can be seated with other humans
    pub queue_wait_secs: u64,

    /// Seconds after which a lone entry is seated with fallback players
    pub queue_max_wait_secs: u64,

    /// Period of the background matching pass
    pub matching_interval_ms: u64,

    /// Delay between fallback moves (match actor tick)
    pub fallback_think_ms: u64,

    /// Buffered notifications per subscriber before they are dropped
    pub subscriber_buffer: usize,

    /// Match actor inbox capacity
    pub inbox_size: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            valid_stakes: DEFAULT_VALID_STAKES.to_vec(),
            queue_wait_secs: DEFAULT_QUEUE_WAIT_SECS,
            queue_max_wait_secs: DEFAULT_QUEUE_MAX_WAIT_SECS,
            matching_interval_ms: 1000,
            fallback_think_ms: 1000,
            subscriber_buffer: 32,
            inbox_size: 100,
        }
    }
}

impl LobbyConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.valid_stakes.is_empty() {
            return Err("At least one stake must be allowed".to_string());
        }

        if self.valid_stakes.contains(&0) {
            return Err("Stakes must be positive".to_string());
        }

        if self.queue_max_wait_secs > MAX_QUEUE_WAIT_SECS {
            return Err(format!(
                "Queue max wait must be at most {MAX_QUEUE_WAIT_SECS} seconds"
            ));
        }

        if self.queue_wait_secs >= self.queue_max_wait_secs {
            return Err("Queue wait must be shorter than queue max wait".to_string());
        }

        if self.matching_interval_ms == 0 || self.fallback_think_ms == 0 {
            return Err("Matching and fallback intervals must be non-zero".to_string());
        }

        if self.subscriber_buffer == 0 || self.inbox_size == 0 {
            return Err("Channel sizes must be non-zero".to_string());
        }

        Ok(())
    }
}
