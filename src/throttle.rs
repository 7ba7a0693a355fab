//! Leading-edge rate limiting.
//!
//! [`Throttle`] lets a repeated action through at most once per interval.
//! The first call runs immediately; calls that arrive before the interval
//! has elapsed since the last *executed* call are dropped.  Nothing is
//! queued and nothing is re-run at the end of the window.
//!
//! The caller supplies the current time so the throttle works the same
//! against a real clock and a test clock.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_run: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
        }
    }

    /// Record an execution at `now` if the throttle is open.
    ///
    /// Returns `true` when the caller should run the action.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        match self.last_run {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_run = Some(now);
                true
            }
        }
    }

    /// Run `f` if the throttle is open at `now`, returning its result.
    pub fn call<T>(&mut self, now: Instant, f: impl FnOnce() -> T) -> Option<T> {
        if self.try_acquire(now) {
            Some(f())
        } else {
            None
        }
    }
}
