//! Date keys the daily poster puts in its embed title. The poster's format
//! has varied, so several spellings of the same date are accepted.

use chrono::{Datelike, NaiveDate};

pub fn title_keys(date: NaiveDate) -> Vec<String> {
    let (year, month, day) = (date.year(), date.month(), date.day());
    vec![
        format!("{year}年{month}月{day}日"),
        format!("{year}年{month:02}月{day:02}日"),
        format!("{:02}年{month:02}月{day:02}日", year.rem_euclid(100)),
        format!("{month}月{day}日"),
        format!("{month:02}月{day:02}日"),
    ]
}

/// True when `title` names `date` in one of the accepted spellings. A key
/// only counts when it is not glued to a preceding digit, so `1月20日` does
/// not match inside `11月20日`.
pub fn title_names_date(title: &str, date: NaiveDate) -> bool {
    title_keys(date)
        .iter()
        .any(|key| contains_unglued(title, key))
}

fn contains_unglued(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(idx, _)| {
        !haystack[..idx]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_digit())
    })
}
