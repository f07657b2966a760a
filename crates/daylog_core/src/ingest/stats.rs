//! Per-day derived fields and category totals.
//!
//! # Responsibility
//! - Assign logical ids, durations and absolute timestamps to activities.
//! - Aggregate category totals through a prefix rule table.
//!
//! # Invariants
//! - Recomputation is from scratch; the result depends only on the date and
//!   the ordered activity list.
//! - On error the day is left untouched.

use crate::ingest::line::span_minutes;
use crate::model::day::{ActivityStats, DayRecord};
use chrono::{NaiveDate, NaiveTime};
use std::error::Error;
use std::fmt::{Display, Formatter};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
const LOGICAL_ID_FACTOR: i64 = 10_000;

#[derive(Debug, Clone, Copy)]
enum StatField {
    SleepNight,
    SleepDay,
    Study,
    Exercise,
    Cardio,
    Anaerobic,
    Grooming,
    Toilet,
    Gaming,
    Recreation,
    RecreationZhihu,
    RecreationBilibili,
    RecreationDouyin,
}

/// Every matching prefix accumulates, so one activity may count at several
/// hierarchy levels (`exercise_cardio` adds to exercise and cardio).
const STAT_RULES: &[(&str, StatField)] = &[
    ("sleep_night", StatField::SleepNight),
    ("sleep_day", StatField::SleepDay),
    ("study", StatField::Study),
    ("exercise", StatField::Exercise),
    ("exercise_cardio", StatField::Cardio),
    ("exercise_anaerobic", StatField::Anaerobic),
    ("routine_grooming", StatField::Grooming),
    ("routine_toilet", StatField::Toilet),
    ("recreation_game", StatField::Gaming),
    ("recreation", StatField::Recreation),
    ("recreation_zhihu", StatField::RecreationZhihu),
    ("recreation_bilibili", StatField::RecreationBilibili),
    ("recreation_douyin", StatField::RecreationDouyin),
];

fn field_mut(stats: &mut ActivityStats, field: StatField) -> &mut i64 {
    match field {
        StatField::SleepNight => &mut stats.sleep_night_time,
        StatField::SleepDay => &mut stats.sleep_day_time,
        StatField::Study => &mut stats.study_time,
        StatField::Exercise => &mut stats.total_exercise_time,
        StatField::Cardio => &mut stats.cardio_time,
        StatField::Anaerobic => &mut stats.anaerobic_time,
        StatField::Grooming => &mut stats.grooming_time,
        StatField::Toilet => &mut stats.toilet_time,
        StatField::Gaming => &mut stats.gaming_time,
        StatField::Recreation => &mut stats.recreation_time,
        StatField::RecreationZhihu => &mut stats.recreation_zhihu_time,
        StatField::RecreationBilibili => &mut stats.recreation_bilibili_time,
        StatField::RecreationDouyin => &mut stats.recreation_douyin_time,
    }
}

/// Errors that abort stats for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    InvalidDate(String),
    InvalidTime { date: String, time: String },
}

impl Display for StatsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDate(date) => write!(f, "cannot compute stats for invalid date `{date}`"),
            Self::InvalidTime { date, time } => {
                write!(f, "cannot compute stats for {date}: invalid time `{time}`")
            }
        }
    }
}

impl Error for StatsError {}

struct Derived {
    logical_id: i64,
    duration_seconds: i64,
    start_timestamp: i64,
    end_timestamp: i64,
}

/// Recomputes ids, durations, timestamps, totals and flags of `day`.
pub fn compute_day_stats(day: &mut DayRecord) -> Result<(), StatsError> {
    let date_key = day
        .date_as_integer()
        .ok_or_else(|| StatsError::InvalidDate(day.date.clone()))?;
    let date = NaiveDate::parse_from_str(&day.date, "%Y-%m-%d")
        .map_err(|_| StatsError::InvalidDate(day.date.clone()))?;

    let mut derived = Vec::with_capacity(day.activities.len());
    for (index, activity) in day.activities.iter().enumerate() {
        let start = epoch_seconds(date, &activity.start_time, &day.date)?;
        let mut end = epoch_seconds(date, &activity.end_time, &day.date)?;
        if end < start {
            end += SECONDS_PER_DAY;
        }
        let minutes = span_minutes(&activity.start_time, &activity.end_time).ok_or_else(|| {
            StatsError::InvalidTime {
                date: day.date.clone(),
                time: activity.start_time.clone(),
            }
        })?;
        derived.push(Derived {
            logical_id: date_key * LOGICAL_ID_FACTOR + index as i64 + 1,
            duration_seconds: minutes * 60,
            start_timestamp: start,
            end_timestamp: end,
        });
    }

    let mut stats = ActivityStats::default();
    for (activity, derived) in day.activities.iter_mut().zip(derived) {
        activity.logical_id = derived.logical_id;
        activity.duration_seconds = derived.duration_seconds;
        activity.start_timestamp = derived.start_timestamp;
        activity.end_timestamp = derived.end_timestamp;

        for (prefix, field) in STAT_RULES {
            if activity.project_path.starts_with(prefix) {
                *field_mut(&mut stats, *field) += activity.duration_seconds;
            }
        }
    }
    stats.sleep_total_time = stats.sleep_night_time + stats.sleep_day_time;

    day.stats = stats;
    day.has_study = day.has_activity_under("study");
    day.has_exercise = day.has_activity_under("exercise");
    Ok(())
}

fn epoch_seconds(date: NaiveDate, time: &str, day: &str) -> Result<i64, StatsError> {
    let time = NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| StatsError::InvalidTime {
        date: day.to_string(),
        time: time.to_string(),
    })?;
    Ok(date.and_time(time).and_utc().timestamp())
}
