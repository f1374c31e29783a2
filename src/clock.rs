use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Source of the current instant, injected so settlement dates are deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Business date in `tz`. Settlement and payment dates use this, not the UTC date.
    fn today_in(&self, tz: Tz) -> NaiveDate {
        self.now().with_timezone(&tz).date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn business_date_follows_timezone() {
        // 22:30 UTC is already the next day in Kuwait (UTC+3).
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 31, 22, 30, 0).unwrap());
        assert_eq!(
            clock.today_in(chrono_tz::Asia::Kuwait),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
        );
        assert_eq!(
            clock.today_in(chrono_tz::UTC),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
        );
    }
}
