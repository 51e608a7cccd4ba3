//! Debounce bookkeeping with explicit timer tokens.
//!
//! The state machine never sleeps. It hands out a [`TimerToken`] for every
//! scheduled firing, and whoever owns the clock reports the token back when
//! the delay elapses. Only the most recently issued token is honoured.

use std::time::Duration;

/// Identifies one scheduled firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    armed: bool,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            armed: false,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arms the debouncer, superseding any token issued before.
    pub fn schedule(&mut self) -> TimerToken {
        self.generation += 1;
        self.armed = true;
        TimerToken(self.generation)
    }

    /// Returns true when `token` is the live one; disarms on success.
    pub fn fire(&mut self, token: TimerToken) -> bool {
        if self.armed && token.0 == self.generation {
            self.armed = false;
            return true;
        }
        false
    }

    pub fn cancel(&mut self) {
        self.armed = false;
    }

    pub fn is_pending(&self) -> bool {
        self.armed
    }
}
