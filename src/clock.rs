use chrono::{DateTime, Local, TimeZone};

/// Source of "now" for statement age checks.
///
/// Statement dates are calendar days in the local time zone, so the clock
/// reports local time too.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock pinned to one instant, for deterministic runs in tests.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: DateTime<Local>,
}

impl FixedClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self { now }
    }

    /// Noon local time on the given day.
    ///
    /// Returns `None` for dates that do not exist.
    pub fn at_local_noon(year: i32, month: u32, day: u32) -> Option<Self> {
        Local
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .earliest()
            .map(Self::new)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.now
    }
}
