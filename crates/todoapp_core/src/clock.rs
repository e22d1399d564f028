//! Timestamp sources for task mutations.
//!
//! Stamps are truncated to whole milliseconds so in-memory tasks compare
//! equal to their persisted form after a round-trip.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use std::cell::Cell;

/// Source of "now" for task creation and mutation.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

/// Manually driven clock for deterministic tests and replays.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start.trunc_subsecs(3)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now.trunc_subsecs(3));
    }

    /// Moves the clock forward by `millis` milliseconds.
    pub fn advance_ms(&self, millis: i64) {
        self.now.set(self.now.get() + TimeDelta::milliseconds(millis));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, ManualClock, SystemClock};
    use chrono::{TimeZone, Timelike, Utc};

    #[test]
    fn system_clock_has_millisecond_precision() {
        let now = SystemClock.now();
        assert_eq!(now.nanosecond() % 1_000_000, 0);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(Utc.timestamp_millis_opt(1_000).unwrap());
        clock.advance_ms(250);
        assert_eq!(clock.now().timestamp_millis(), 1_250);
        clock.set(Utc.timestamp_millis_opt(5_000).unwrap());
        assert_eq!((&clock).now().timestamp_millis(), 5_000);
    }
}
