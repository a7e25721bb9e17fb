//! Boundary: wall-clock access.
//!
//! Everything that stamps or compares time goes through [`Clock`] so tests can
//! pin it.

use chrono::{DateTime, Local, TimeZone, Timelike, Utc};

use attune_types::TimeOfDay;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Local wall-clock time used by time-of-day policy clauses.
    fn local_time_of_day(&self) -> TimeOfDay;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_time_of_day(&self) -> TimeOfDay {
        hh_mm(&Local::now())
    }
}

/// Always reports the same instant and local time.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: DateTime<Utc>,
    local: TimeOfDay,
}

impl FixedClock {
    #[must_use]
    pub fn new(now: DateTime<Utc>, local: TimeOfDay) -> Self {
        Self { now, local }
    }

    /// Uses the UTC wall time of `now` as the local time.
    #[must_use]
    pub fn utc(now: DateTime<Utc>) -> Self {
        let local = hh_mm(&now);
        Self { now, local }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn local_time_of_day(&self) -> TimeOfDay {
        self.local.clone()
    }
}

fn hh_mm<Tz: TimeZone>(at: &DateTime<Tz>) -> TimeOfDay {
    TimeOfDay::from_clock(at.hour(), at.minute())
}
