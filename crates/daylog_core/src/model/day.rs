//! Day and activity records.
//!
//! # Responsibility
//! - Carry one calendar day from structural parse to persistence.
//! - Render the stable serialized shape (`headers`, `activities`,
//!   `generated_stats`).
//!
//! # Invariants
//! - `date` is ISO `YYYY-MM-DD` and unique across one conversion run.
//! - `stats` always reflects the current `activities` list; callers that
//!   mutate the list must recompute stats.

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Sentinel written for the getup time of a continuation day.
pub const GETUP_NULL_SENTINEL: &str = "Null";

/// Calendar month grouping key; orders by year, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One normalized activity inside a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    /// `date_as_integer * 10000 + sequence_within_day` (1-based).
    pub logical_id: i64,
    /// Epoch seconds of `date + start_time`.
    pub start_timestamp: i64,
    /// Epoch seconds of `date + end_time`, rolled +24h for overnight spans.
    pub end_timestamp: i64,
    /// `HH:MM`.
    pub start_time: String,
    /// `HH:MM`.
    pub end_time: String,
    pub duration_seconds: i64,
    pub remark: Option<String>,
    /// Canonical, alias-resolved path such as `study_english`.
    pub project_path: String,
}

impl Activity {
    /// Creates an activity whose derived fields are filled in by stats.
    pub fn new(
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        project_path: impl Into<String>,
    ) -> Self {
        Self {
            logical_id: 0,
            start_timestamp: 0,
            end_timestamp: 0,
            start_time: start_time.into(),
            end_time: end_time.into(),
            duration_seconds: 0,
            remark: None,
            project_path: project_path.into(),
        }
    }

    pub fn with_remark(mut self, remark: Option<String>) -> Self {
        self.remark = remark;
        self
    }
}

/// Per-day duration totals in seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityStats {
    pub sleep_night_time: i64,
    pub sleep_day_time: i64,
    pub sleep_total_time: i64,
    pub study_time: i64,
    pub total_exercise_time: i64,
    pub cardio_time: i64,
    pub anaerobic_time: i64,
    pub grooming_time: i64,
    pub toilet_time: i64,
    pub gaming_time: i64,
    pub recreation_time: i64,
    pub recreation_zhihu_time: i64,
    pub recreation_bilibili_time: i64,
    pub recreation_douyin_time: i64,
}

/// One calendar day of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRecord {
    /// ISO `YYYY-MM-DD`.
    pub date: String,
    pub year: i32,
    pub month: u32,
    /// Remark lines joined with `\n`; empty when the day has none.
    pub remark: String,
    /// `HH:MM`; `None` for a continuation day.
    pub getup_time: Option<String>,
    pub has_study: bool,
    pub has_exercise: bool,
    /// Set when the day's own log lines contain a `sleep` activity.
    pub has_sleep: bool,
    pub activities: Vec<Activity>,
    pub stats: ActivityStats,
}

impl DayRecord {
    /// Creates an empty day for `year-month-day`.
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self {
            date: format!("{year:04}-{month:02}-{day:02}"),
            year,
            month,
            remark: String::new(),
            getup_time: None,
            has_study: false,
            has_exercise: false,
            has_sleep: false,
            activities: Vec::new(),
            stats: ActivityStats::default(),
        }
    }

    pub fn month_key(&self) -> MonthKey {
        MonthKey::new(self.year, self.month)
    }

    /// Returns the date with separators stripped, e.g. `20240131`.
    pub fn date_as_integer(&self) -> Option<i64> {
        self.date.replace('-', "").parse().ok()
    }

    /// Returns the day-of-month component of `date`.
    pub fn day_of_month(&self) -> Option<u32> {
        self.date.rsplit('-').next()?.parse().ok()
    }

    /// Returns `true` when the day is a direct continuation of the previous night.
    pub fn is_continuation(&self) -> bool {
        self.getup_time.is_none()
    }

    /// Returns the end time of the day's last activity.
    pub fn last_end_time(&self) -> Option<&str> {
        self.activities.last().map(|activity| activity.end_time.as_str())
    }

    pub fn has_activity_under(&self, prefix: &str) -> bool {
        self.activities
            .iter()
            .any(|activity| activity.project_path.starts_with(prefix))
    }

    /// Renders the persisted document shape.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(DayDocument::from(self))
    }
}

#[derive(Serialize)]
struct DayDocument<'a> {
    headers: DayHeaders<'a>,
    activities: &'a [Activity],
    generated_stats: &'a ActivityStats,
}

#[derive(Serialize)]
struct DayHeaders<'a> {
    date: &'a str,
    status: u8,
    exercise: u8,
    sleep: u8,
    getup: &'a str,
    activity_count: usize,
    remark: &'a str,
}

impl<'a> From<&'a DayRecord> for DayDocument<'a> {
    fn from(day: &'a DayRecord) -> Self {
        Self {
            headers: DayHeaders {
                date: day.date.as_str(),
                status: u8::from(day.has_study),
                exercise: u8::from(day.has_exercise),
                sleep: u8::from(day.has_sleep),
                getup: day.getup_time.as_deref().unwrap_or(GETUP_NULL_SENTINEL),
                activity_count: day.activities.len(),
                remark: day.remark.as_str(),
            },
            activities: &day.activities,
            generated_stats: &day.stats,
        }
    }
}
