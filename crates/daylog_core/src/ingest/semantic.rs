//! Semantic checks over converted days.
//!
//! # Responsibility
//! - Check time continuity, sleep closure and minimum activity count per day.
//! - Check that one month's day sequence has no gaps.
//!
//! # Invariants
//! - Checks never mutate the day and never abort; they only report.

use crate::config::DateCheckMode;
use crate::model::day::DayRecord;
use crate::model::validation::{ErrorKind, ValidationError};
use chrono::NaiveDate;
use std::collections::BTreeSet;

const MIN_ACTIVITIES_PER_DAY: usize = 2;

/// Checks one converted day.
///
/// `line_number` anchors the diagnostics (usually the date header line).
pub fn validate_day(
    day: &DayRecord,
    sleep_path: &str,
    line_number: usize,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for pair in day.activities.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        if current.start_time != previous.end_time {
            errors.push(ValidationError::new(
                line_number,
                ErrorKind::TimeDiscontinuity,
                format!(
                    "{}: activity `{}` starts at {} but the previous activity ended at {}",
                    day.date, current.project_path, current.start_time, previous.end_time
                ),
            ));
        }
    }

    if day.has_sleep {
        let closes_with_sleep = day
            .activities
            .last()
            .is_some_and(|last| last.project_path == sleep_path);
        if !closes_with_sleep {
            errors.push(ValidationError::new(
                line_number,
                ErrorKind::MissingSleepNight,
                format!("{}: a day with sleep must end with `{sleep_path}`", day.date),
            ));
        }
    }

    if day.activities.len() < MIN_ACTIVITIES_PER_DAY {
        errors.push(ValidationError::new(
            line_number,
            ErrorKind::TooFewActivities,
            format!(
                "{}: only {} activities recorded, day is likely incomplete",
                day.date,
                day.activities.len()
            ),
        ));
    }

    errors
}

/// Returns `true` for Gregorian leap years.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` of `year`; `0` for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Reports days missing from one month according to `mode`.
pub fn check_date_continuity(
    year: i32,
    month: u32,
    days_seen: &BTreeSet<u32>,
    mode: DateCheckMode,
) -> Vec<ValidationError> {
    let last_expected = match mode {
        DateCheckMode::None => return Vec::new(),
        DateCheckMode::Full => days_in_month(year, month),
        DateCheckMode::Continuity => match days_seen.last() {
            Some(max_day) => *max_day,
            None => return Vec::new(),
        },
    };

    (1..=last_expected)
        .filter(|day| !days_seen.contains(day))
        .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
        .map(|date| {
            ValidationError::file_level(
                ErrorKind::DateGap,
                format!("missing date {}", date.format("%Y-%m-%d")),
            )
        })
        .collect()
}
