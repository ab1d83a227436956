use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveTime};

use super::settings::DeadlineSettings;

const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeadlineError {
    #[error("deadline setting missing: {field}")]
    Missing { field: &'static str },
    #[error("unparseable time-of-day for {field}: {value:?}")]
    Unparseable { field: &'static str, value: String },
    #[error("unparseable deadline offset hours: {0:?}")]
    InvalidOffset(String),
}

/// Wall-clock hour and minute, no date attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    pub fn minutes_since_midnight(self) -> i64 {
        i64::from(self.hour) * 60 + i64::from(self.minute)
    }

    /// Clock arithmetic: any total wraps into the same 24h dial.
    fn from_minutes_wrapping(total: i64) -> Self {
        let total = total.rem_euclid(MINUTES_PER_DAY);
        Self {
            hour: (total / 60) as u8,
            minute: (total % 60) as u8,
        }
    }

    /// Shift by fractional hours, rounded to the nearest minute.
    pub fn plus_hours(self, hours: f64) -> Option<Self> {
        if !hours.is_finite() {
            return None;
        }
        let shift = ((hours * 60.0).round() as i64).rem_euclid(MINUTES_PER_DAY);
        Some(Self::from_minutes_wrapping(
            self.minutes_since_midnight() + shift,
        ))
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Accepts `H:MM`, `HH:MM` and `HH:MM:SS` (seconds ignored).
impl FromStr for TimeOfDay {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.trim().split(':');
        let hour = parts.next().ok_or(())?.trim().parse::<u8>().map_err(|_| ())?;
        let minute = parts.next().ok_or(())?.trim().parse::<u8>().map_err(|_| ())?;
        if let Some(seconds) = parts.next() {
            seconds.trim().parse::<u8>().map_err(|_| ())?;
        }
        if parts.next().is_some() {
            return Err(());
        }
        TimeOfDay::new(hour, minute).ok_or(())
    }
}

pub(super) fn parse_time(field: &'static str, raw: Option<&str>) -> Result<TimeOfDay, DeadlineError> {
    let raw = raw.ok_or(DeadlineError::Missing { field })?;
    raw.parse().map_err(|()| DeadlineError::Unparseable {
        field,
        value: raw.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineMode {
    Fixed,
    Relative,
}

/// Today's admission cutoff.
///
/// - `Fixed`: the configured fixed time verbatim.
/// - `Relative`: post time plus the offset in (fractional) hours, wrapped on
///   the 24h dial. There is no cross-midnight handling.
pub fn compute_deadline(settings: &DeadlineSettings) -> Result<TimeOfDay, DeadlineError> {
    match settings.mode {
        DeadlineMode::Fixed => parse_time(
            super::settings::KEY_FIXED_DEADLINE,
            settings.fixed_deadline.as_deref(),
        ),
        DeadlineMode::Relative => {
            let post_time = parse_time(
                super::settings::KEY_POST_TIME,
                settings.post_time.as_deref(),
            )?;
            let raw_offset = settings
                .offset_hours
                .as_deref()
                .ok_or(DeadlineError::Missing {
                    field: super::settings::KEY_OFFSET_HOURS,
                })?;
            let hours = raw_offset
                .trim()
                .parse::<f64>()
                .map_err(|_| DeadlineError::InvalidOffset(raw_offset.to_string()))?;
            post_time
                .plus_hours(hours)
                .ok_or_else(|| DeadlineError::InvalidOffset(raw_offset.to_string()))
        }
    }
}

/// True iff checking is enabled, a deadline is known and `now` is strictly
/// later than that deadline on `now`'s own calendar date.
pub fn is_past_deadline(
    now: DateTime<FixedOffset>,
    deadline: Option<TimeOfDay>,
    enabled: bool,
) -> bool {
    if !enabled {
        return false;
    }
    let Some(deadline) = deadline else {
        return false;
    };
    now.time() > deadline.to_naive_time()
}
