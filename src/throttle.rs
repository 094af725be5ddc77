//! Fixed-interval throttle for pointer-move processing.
//!
//! Callers pass `now` explicitly so behaviour is deterministic under test.
//! Skipped samples are simply dropped; the next accepted one carries the
//! latest position.

#[cfg(test)]
#[path = "throttle_test.rs"]
mod throttle_test;

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    /// Returns `true` and records `now` if at least one interval has passed
    /// since the last accepted call. The first call is always accepted.
    pub fn ready(&mut self, now: Instant) -> bool {
        let accept = match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if accept {
            self.last = Some(now);
        }
        accept
    }

    /// Forget the last accepted instant so the next call goes through.
    pub fn reset(&mut self) {
        self.last = None;
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
