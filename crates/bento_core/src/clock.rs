//! Wall clock in the office's fixed UTC offset. "Today", "now" and the
//! reaction time all come from here.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc};

/// Offset used when none is configured (UTC+9).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(hours.checked_mul(3600)?)
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        // 9h is always a valid offset.
        Self::new(FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600).unwrap_or(Utc.fix()))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// `y-m-d h:m` in the given offset. Returns `None` for an invalid instant.
    pub fn at(
        offset: FixedOffset,
        date: (i32, u32, u32),
        time: (u32, u32),
    ) -> Option<Self> {
        let instant = offset
            .with_ymd_and_hms(date.0, date.1, date.2, time.0, time.1, 0)
            .single()?;
        Some(Self::new(instant))
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_uses_configured_offset() {
        let offset = offset_from_hours(9).expect("offset");
        let clock = SystemClock::new(offset);
        assert_eq!(clock.now().offset().local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_manual_clock_advances() {
        let offset = offset_from_hours(9).expect("offset");
        let clock = ManualClock::at(offset, (2026, 1, 20), (8, 59)).expect("clock");
        clock.advance(Duration::minutes(2));
        assert_eq!(clock.now().format("%H:%M").to_string(), "09:01");
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 1, 20).expect("date"));
    }

    #[test]
    fn test_offset_rejects_out_of_range_hours() {
        assert!(offset_from_hours(30).is_none());
    }
}
