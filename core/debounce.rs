//! Debounce state for collapsing bursts of filesystem events into one rebuild.
//!
//! Editors typically produce several notifications per save (write to temp,
//! rename, chmod). The state here is pure so the timing rules can be tested
//! with explicit instants.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Pending { first: Instant, last: Instant },
}

/// Idle until an event arrives, then pending until either no event has
/// arrived for `delay` or `max_window` has passed since the first event.
#[derive(Debug, Clone)]
pub struct Debouncer {
    state: State,
    delay: Duration,
    max_window: Duration,
}

impl Debouncer {
    pub fn new(delay: Duration, max_window: Duration) -> Self {
        Self {
            state: State::Idle,
            delay,
            max_window: max_window.max(delay),
        }
    }

    /// Records an event seen at `now`, arming or re-arming the timer.
    pub fn record(&mut self, now: Instant) {
        self.state = match self.state {
            State::Idle => State::Pending {
                first: now,
                last: now,
            },
            State::Pending { first, .. } => State::Pending { first, last: now },
        };
    }

    /// When the pending burst should fire, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            State::Idle => None,
            State::Pending { first, last } => {
                Some((last + self.delay).min(first + self.max_window))
            }
        }
    }

    /// Returns true, and goes back to idle, if the burst is due at `now`.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.state = State::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending { .. })
    }

    pub fn reset(&mut self) {
        self.state = State::Idle;
    }
}
