//! Monotonic simulation clock (component B).
//!
//! A logical counter, not a wall clock: reproducibility of a backtest
//! hinges on `now()` never reading real time. Bar timestamps are
//! coarse (often minute-scale); many orders may be placed and closed
//! within a single bar, so `now()` hands out a strictly increasing
//! timestamp per call, preserving submission order as a tiebreaker in
//! later sorts without needing a real clock.

use chrono::{DateTime, Duration, Utc};

/// Default tock interval: 1 millisecond.
pub const DEFAULT_TOCK: Duration = Duration::milliseconds(1);

#[derive(Debug, Clone)]
pub struct Clock {
    now: DateTime<Utc>,
    interval: Duration,
    elapsed: Duration,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            now: DateTime::<Utc>::UNIX_EPOCH,
            interval: DEFAULT_TOCK,
            elapsed: Duration::zero(),
        }
    }
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the clock with a new start time and tock interval.
    pub fn start(&mut self, start: DateTime<Utc>, tock: Duration) {
        self.now = start;
        self.interval = tock;
        self.elapsed = Duration::zero();
    }

    /// Advances the clock to `epoch`. Undefined behavior (the elapsed
    /// duration may go negative) if `epoch` is earlier than the
    /// current time — callers never need to rewind the simulation.
    pub fn advance(&mut self, epoch: DateTime<Utc>) {
        self.elapsed += epoch - self.now;
        self.now = epoch;
    }

    /// Returns the time incremented by one tock (1ms by default).
    /// Every call returns a strictly later time than the last.
    pub fn now(&mut self) -> DateTime<Utc> {
        self.now += self.interval;
        self.now
    }

    /// Returns the current time without advancing it.
    pub fn peek(&self) -> DateTime<Utc> {
        self.now
    }

    /// Total elapsed duration since `start`, accumulated on each
    /// `advance` call. Used for funding-charge accrual.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
