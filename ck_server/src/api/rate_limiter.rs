//! Rate limiting for WebSocket move messages.
//!
//! Each socket carries a [`SocketLimiter`]: a short burst window and a longer
//! sustained window, both sliding.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sliding window counter
#[derive(Debug)]
pub struct SlidingWindow {
    /// Timestamps of accepted messages inside the window
    timestamps: VecDeque<Instant>,
    max_messages: usize,
    window: Duration,
}

impl SlidingWindow {
    /// # Example
    ///
    /// ```
    /// use ck_server::api::rate_limiter::SlidingWindow;
    /// use std::time::Duration;
    ///
    /// let mut window = SlidingWindow::new(2, Duration::from_secs(1));
    /// assert!(window.admit());
    /// assert!(window.admit());
    /// assert!(!window.admit());
    /// ```
    pub fn new(max_messages: usize, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max_messages),
            max_messages,
            window,
        }
    }

    /// Records the message and returns true if it fits in the window.
    pub fn admit(&mut self) -> bool {
        self.admit_at(Instant::now())
    }

    fn admit_at(&mut self, now: Instant) -> bool {
        while let Some(ts) = self.timestamps.front() {
            if now.duration_since(*ts) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }

        if self.timestamps.len() >= self.max_messages {
            return false;
        }
        self.timestamps.push_back(now);
        true
    }

    pub fn remaining(&self) -> usize {
        self.max_messages.saturating_sub(self.timestamps.len())
    }
}

/// Which limit a rejected message hit
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Limit {
    Burst,
    Sustained,
}

impl Limit {
    pub fn message(self) -> &'static str {
        match self {
            Self::Burst => "Rate limit exceeded. Please slow down.",
            Self::Sustained => "Too many messages. Please wait before sending more.",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Burst => "ws_burst",
            Self::Sustained => "ws_sustained",
        }
    }
}

/// Per-socket limiter: 10 messages per second, 100 per minute.
#[derive(Debug)]
pub struct SocketLimiter {
    burst: SlidingWindow,
    sustained: SlidingWindow,
}

impl SocketLimiter {
    pub fn new() -> Self {
        Self {
            burst: SlidingWindow::new(10, Duration::from_secs(1)),
            sustained: SlidingWindow::new(100, Duration::from_secs(60)),
        }
    }

    pub fn check(&mut self) -> Result<(), Limit> {
        self.check_at(Instant::now())
    }

    fn check_at(&mut self, now: Instant) -> Result<(), Limit> {
        if !self.burst.admit_at(now) {
            return Err(Limit::Burst);
        }
        if !self.sustained.admit_at(now) {
            return Err(Limit::Sustained);
        }
        Ok(())
    }
}

impl Default for SocketLimiter {
    fn default() -> Self {
        Self::new()
    }
}
