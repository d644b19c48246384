//! Cooperative timers driven by the host's tick loop.
//!
//! Nothing here spawns threads or sleeps. The host passes the current
//! [`Instant`] on every tick and due events are delivered synchronously on
//! that call, on the same context that renders the UI.

use std::time::{Duration, Instant};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Whole-second countdown, restartable after cancel or natural expiry.
#[derive(Debug, Clone)]
pub struct Countdown {
    period: Duration,
    remaining: u32,
    next_tick: Option<Instant>,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Countdown {
    #[must_use]
    pub fn new() -> Self {
        Self::with_period(TICK_PERIOD)
    }

    #[must_use]
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            remaining: 0,
            next_tick: None,
        }
    }

    /// Begin (or restart) counting down from `seconds`.
    pub fn start(&mut self, seconds: u32, now: Instant) {
        self.remaining = seconds;
        self.next_tick = (seconds > 0).then(|| now + self.period);
    }

    /// Stop emitting ticks. Idempotent.
    pub fn cancel(&mut self) {
        self.next_tick = None;
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Deliver every tick that is due at `now`, calling `on_tick` with the
    /// new remaining value for each one. Returns how many ticks fired.
    ///
    /// A host that falls behind gets the missed ticks in a burst; the count
    /// never skips a value and stops at zero.
    pub fn poll(&mut self, now: Instant, mut on_tick: impl FnMut(u32)) -> u32 {
        let mut fired = 0;
        while let Some(due) = self.next_tick {
            if due > now {
                break;
            }
            self.remaining = self.remaining.saturating_sub(1);
            fired += 1;
            on_tick(self.remaining);
            self.next_tick = (self.remaining > 0).then(|| due + self.period);
        }
        fired
    }
}

/// Single delayed event, cancelable before it fires.
#[derive(Debug, Clone, Default)]
pub struct OneShotTimer {
    deadline: Option<Instant>,
}

impl OneShotTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, delay: Duration, now: Instant) {
        self.deadline = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` exactly once, on the first poll at or after the deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
