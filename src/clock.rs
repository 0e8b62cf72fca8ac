use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Source of "now" for components that compare against wall-clock time.
/// Injected so batch runs can be replayed against a fixed date.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant, for deterministic runs and tests.
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at_date(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::MIN).and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
