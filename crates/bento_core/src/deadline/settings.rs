//! Deadline-related rows of the settings table and the snapshot the session
//! keeps after each refresh.

use chrono::{DateTime, FixedOffset};
use tracing::warn;

use super::policy::{DeadlineMode, TimeOfDay, compute_deadline, is_past_deadline};
use crate::ports::{SheetStore, StoreError, Table, cell};

pub const KEY_MODE: &str = "締切モード";
pub const KEY_FIXED_DEADLINE: &str = "締切固定モード";
pub const KEY_POST_TIME: &str = "投稿時間";
pub const KEY_OFFSET_HOURS: &str = "締切任意モード";
pub const KEY_CHECK: &str = "締切チェック";

/// Value of `締切モード` selecting the fixed deadline; anything else is relative.
pub const MODE_FIXED: &str = "固定";
pub const CHECK_ON: &str = "ON";
pub const CHECK_OFF: &str = "OFF";

/// Raw deadline settings as read from the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadlineSettings {
    pub mode: DeadlineMode,
    pub fixed_deadline: Option<String>,
    pub post_time: Option<String>,
    pub offset_hours: Option<String>,
    pub check: Option<String>,
}

impl DeadlineSettings {
    /// Settings rows are `key | value`; the first row with a matching key wins.
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let lookup = |key: &str| {
            rows.iter()
                .find(|row| cell(row, 0) == key)
                .map(|row| cell(row, 1).to_string())
        };
        let mode = match lookup(KEY_MODE).as_deref().map(str::trim) {
            Some(MODE_FIXED) => DeadlineMode::Fixed,
            _ => DeadlineMode::Relative,
        };
        Self {
            mode,
            fixed_deadline: lookup(KEY_FIXED_DEADLINE),
            post_time: lookup(KEY_POST_TIME),
            offset_hours: lookup(KEY_OFFSET_HOURS),
            check: lookup(KEY_CHECK),
        }
    }

    /// `ON` and `OFF` are matched case-insensitively; anything else,
    /// including a missing row, is `Unknown`.
    pub fn check_flag(&self) -> CheckFlag {
        match self.check.as_deref().map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case(CHECK_ON) => CheckFlag::On,
            Some(value) if value.eq_ignore_ascii_case(CHECK_OFF) => CheckFlag::Off,
            other => {
                warn!(value = ?other, "deadline check flag unrecognised; checking disabled");
                CheckFlag::Unknown
            }
        }
    }
}

/// State of the `締切チェック` row.
///
/// `Off` is an explicit waiver: nothing is past and admitted orders are
/// special admits. `Unknown` also disables the cutoff but leaves admitted
/// orders as ordinary orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckFlag {
    On,
    Off,
    #[default]
    Unknown,
}

impl CheckFlag {
    pub fn enabled(self) -> bool {
        self == CheckFlag::On
    }
}

/// Read the settings table. Called before every admission decision so sheet
/// edits apply to the next reaction.
pub async fn load_settings(store: &dyn SheetStore) -> Result<DeadlineSettings, StoreError> {
    let rows = store.read_rows(Table::Settings).await?;
    Ok(DeadlineSettings::from_rows(&rows))
}

/// The (deadline, enabled) pair swapped into the session as one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeadlineSnapshot {
    pub deadline: Option<TimeOfDay>,
    pub check: CheckFlag,
}

impl DeadlineSnapshot {
    /// Evaluate settings; an unusable deadline leaves `deadline` unset so the
    /// gate fails open.
    pub fn resolve(settings: &DeadlineSettings) -> Self {
        let check = settings.check_flag();
        let deadline = match compute_deadline(settings) {
            Ok(deadline) => Some(deadline),
            Err(err) => {
                warn!(error = %err, "deadline unavailable; admitting without cutoff");
                None
            }
        };
        Self { deadline, check }
    }

    pub fn enabled(&self) -> bool {
        self.check.enabled()
    }

    pub fn is_past(&self, now: DateTime<FixedOffset>) -> bool {
        is_past_deadline(now, self.deadline, self.enabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, value: &str) -> Vec<String> {
        vec![key.to_string(), value.to_string()]
    }

    #[test]
    fn test_from_rows_fixed_mode() {
        let rows = vec![
            row(KEY_MODE, "固定"),
            row(KEY_FIXED_DEADLINE, "10:30"),
            row(KEY_CHECK, "ON"),
        ];
        let settings = DeadlineSettings::from_rows(&rows);
        assert_eq!(settings.mode, DeadlineMode::Fixed);
        let snapshot = DeadlineSnapshot::resolve(&settings);
        assert_eq!(snapshot.deadline, TimeOfDay::new(10, 30));
        assert_eq!(snapshot.check, CheckFlag::On);
    }

    #[test]
    fn test_unknown_mode_falls_back_to_relative() {
        let rows = vec![
            row(KEY_MODE, "任意"),
            row(KEY_POST_TIME, "07:00"),
            row(KEY_OFFSET_HOURS, "2"),
        ];
        let settings = DeadlineSettings::from_rows(&rows);
        assert_eq!(settings.mode, DeadlineMode::Relative);
        assert_eq!(DeadlineSnapshot::resolve(&settings).deadline, TimeOfDay::new(9, 0));
    }

    #[test]
    fn test_missing_check_flag_is_unknown() {
        let settings = DeadlineSettings::from_rows(&[row(KEY_MODE, "固定")]);
        assert_eq!(settings.check_flag(), CheckFlag::Unknown);
        assert!(!settings.check_flag().enabled());
    }

    #[test]
    fn test_check_flag_is_case_insensitive() {
        let off = DeadlineSettings::from_rows(&[row(KEY_CHECK, " off ")]);
        assert_eq!(off.check_flag(), CheckFlag::Off);
        let on = DeadlineSettings::from_rows(&[row(KEY_CHECK, "On")]);
        assert_eq!(on.check_flag(), CheckFlag::On);
    }

    #[test]
    fn test_unparseable_fixed_deadline_leaves_snapshot_open() {
        let rows = vec![
            row(KEY_MODE, "固定"),
            row(KEY_FIXED_DEADLINE, "noon"),
            row(KEY_CHECK, "ON"),
        ];
        let snapshot = DeadlineSnapshot::resolve(&DeadlineSettings::from_rows(&rows));
        assert_eq!(snapshot.deadline, None);
        assert!(snapshot.enabled());
    }
}
