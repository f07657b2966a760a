//! Cross-day sleep linking.
//!
//! # Responsibility
//! - Synthesize the overnight sleep that spans from one day's last event to
//!   the next day's wake time.
//! - Sweep month buckets forward once to repair month boundaries.
//!
//! # Invariants
//! - A day is patched at most once and only at index 0.
//! - Inside one file only the immediately preceding calendar day links; at
//!   a month boundary the last logged day of the previous month links.
//! - A patched day has its stats recomputed from scratch.

use crate::config::ConverterConfig;
use crate::ingest::stats::{compute_day_stats, StatsError};
use crate::model::day::{Activity, DayRecord, MonthKey};
use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::BTreeMap;

const SLEEP_PREFIX: &str = "sleep";

/// Owned summary of the day preceding the one being linked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTail {
    pub date: String,
    pub last_end_time: Option<String>,
}

impl DayTail {
    pub fn of(day: &DayRecord) -> Self {
        Self {
            date: day.date.clone(),
            last_end_time: day.last_end_time().map(str::to_string),
        }
    }
}

/// Returns `true` when `day` is eligible for a synthesized overnight sleep.
///
/// Any activity under `sleep` (a logged nap included) or the generated sleep
/// path itself makes the day ineligible.
pub fn needs_sleep_link(day: &DayRecord, sleep_path: &str) -> bool {
    let has_wake_time = day
        .getup_time
        .as_deref()
        .is_some_and(|time| !time.trim().is_empty());
    let has_sleep = day.has_activity_under(SLEEP_PREFIX)
        || day
            .activities
            .iter()
            .any(|activity| activity.project_path == sleep_path);
    has_wake_time && !has_sleep
}

/// Inserts the overnight sleep from `previous` into `day` when eligible.
///
/// Dates are not compared; callers decide which day precedes which.
/// Returns whether `day` was patched.
pub fn link_pair(
    previous: &DayTail,
    day: &mut DayRecord,
    sleep_path: &str,
) -> Result<bool, StatsError> {
    if !needs_sleep_link(day, sleep_path) {
        return Ok(false);
    }
    let (Some(start), Some(end)) = (previous.last_end_time.as_ref(), day.getup_time.as_ref())
    else {
        return Ok(false);
    };

    let sleep = Activity::new(start.clone(), end.clone(), sleep_path);
    day.activities.insert(0, sleep);
    if let Err(err) = compute_day_stats(day) {
        day.activities.remove(0);
        return Err(err);
    }
    Ok(true)
}

/// Like [`link_pair`], but only when `previous` is the calendar day before
/// `day`. Used between days of one file, where a date gap means the night
/// was not logged.
pub fn link_adjacent(
    previous: &DayTail,
    day: &mut DayRecord,
    sleep_path: &str,
) -> Result<bool, StatsError> {
    if !is_day_before(&previous.date, &day.date) {
        return Ok(false);
    }
    link_pair(previous, day, sleep_path)
}

fn is_day_before(previous: &str, current: &str) -> bool {
    let parse = |value: &str| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok();
    match (parse(previous), parse(current)) {
        (Some(previous), Some(current)) => previous.succ_opt() == Some(current),
        _ => false,
    }
}

/// Links the first day of every month to the last logged day of the month
/// before, whatever its date.
///
/// Buckets are visited in key order and each bucket's days are sorted by date
/// first. A day whose stats cannot be recomputed stays unpatched and is
/// logged.
pub fn link_and_finalize(
    mut buckets: BTreeMap<MonthKey, Vec<DayRecord>>,
    config: &ConverterConfig,
) -> BTreeMap<MonthKey, Vec<DayRecord>> {
    let sleep_path = config.sleep_path();
    let mut previous: Option<DayTail> = None;
    let mut linked = 0usize;

    for (month, days) in buckets.iter_mut() {
        days.sort_by(|left, right| left.date.cmp(&right.date));

        if let (Some(tail), Some(first)) = (previous.as_ref(), days.first_mut()) {
            match link_pair(tail, first, sleep_path) {
                Ok(true) => {
                    linked += 1;
                    debug!(
                        "event=sleep_link module=linker status=ok month={} date={}",
                        month, first.date
                    );
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(
                        "event=sleep_link module=linker status=error month={} error={}",
                        month, err
                    );
                }
            }
        }

        if let Some(last) = days.last() {
            previous = Some(DayTail::of(last));
        }
    }

    debug!(
        "event=link_finalize module=linker status=ok months={} linked={}",
        buckets.len(),
        linked
    );
    buckets
}
