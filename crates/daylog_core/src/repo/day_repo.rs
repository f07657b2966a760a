//! Transactional batch writer for days and time records.
//!
//! # Responsibility
//! - Upsert day rows and insert their time records in one transaction.
//! - Replace one calendar month atomically.
//!
//! # Invariants
//! - Every batch runs inside one `IMMEDIATE` transaction; any error rolls the
//!   whole batch back.
//! - Project ids are resolved through a resolver created for this batch only.
//! - A written day owns exactly the records of its batch; older records of
//!   the same date are removed first.
//! - Month ranges are half-open: `[first day, first day of next month)`.

use crate::db::{ensure_schema_ready, DbError};
use crate::model::day::{ActivityStats, DayRecord, GETUP_NULL_SENTINEL};
use crate::repo::project_repo::{ProjectRepoError, ProjectResolver};
use log::{error, info};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type WriteResult<T> = Result<T, WriteError>;

/// Errors from batch writes. Any of them means nothing was written.
#[derive(Debug)]
pub enum WriteError {
    Db(DbError),
    Project(ProjectRepoError),
    InvalidMonth { year: i32, month: u32 },
}

impl Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Project(err) => write!(f, "{err}"),
            Self::InvalidMonth { year, month } => {
                write!(f, "invalid month {year:04}-{month:02}")
            }
        }
    }
}

impl Error for WriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Project(err) => Some(err),
            Self::InvalidMonth { .. } => None,
        }
    }
}

impl From<DbError> for WriteError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ProjectRepoError> for WriteError {
    fn from(value: ProjectRepoError) -> Self {
        Self::Project(value)
    }
}

impl From<rusqlite::Error> for WriteError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Row shape of `days`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRow {
    pub date: String,
    pub year: i32,
    pub month: u32,
    pub status: bool,
    pub exercise: bool,
    pub sleep: bool,
    /// `HH:MM` or the `Null` sentinel.
    pub getup_time: String,
    pub remark: String,
    pub activity_count: usize,
    pub stats: ActivityStats,
}

/// Row shape of `time_records`, keyed by project path until resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRecord {
    pub logical_id: i64,
    pub date: String,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub start_time: String,
    pub end_time: String,
    pub project_path: String,
    pub duration_seconds: i64,
    pub remark: Option<String>,
}

/// One batch of rows to persist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportData {
    pub days: Vec<DayRow>,
    pub records: Vec<TimeRecord>,
}

impl ImportData {
    /// Flattens converted days into day rows and time records.
    pub fn from_days<'a>(days: impl IntoIterator<Item = &'a DayRecord>) -> Self {
        let mut data = Self::default();
        for day in days {
            data.days.push(DayRow {
                date: day.date.clone(),
                year: day.year,
                month: day.month,
                status: day.has_study,
                exercise: day.has_exercise,
                sleep: day.has_sleep,
                getup_time: day
                    .getup_time
                    .clone()
                    .unwrap_or_else(|| GETUP_NULL_SENTINEL.to_string()),
                remark: day.remark.clone(),
                activity_count: day.activities.len(),
                stats: day.stats.clone(),
            });
            data.records
                .extend(day.activities.iter().map(|activity| TimeRecord {
                    logical_id: activity.logical_id,
                    date: day.date.clone(),
                    start_timestamp: activity.start_timestamp,
                    end_timestamp: activity.end_timestamp,
                    start_time: activity.start_time.clone(),
                    end_time: activity.end_time.clone(),
                    project_path: activity.project_path.clone(),
                    duration_seconds: activity.duration_seconds,
                    remark: activity.remark.clone(),
                }));
        }
        data
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty() && self.records.is_empty()
    }
}

/// Counts reported after a committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub days_written: usize,
    pub records_written: usize,
    pub projects_inserted: usize,
    pub days_deleted: usize,
    pub records_deleted: usize,
}

/// Upserts all days and inserts all records in one transaction.
pub fn import(conn: &Connection, data: &ImportData) -> WriteResult<ImportSummary> {
    run_batch("import", conn, |tx| write_rows(tx, data))
}

/// Deletes one month's days and records, then writes `data`, in one transaction.
pub fn replace_month(
    conn: &Connection,
    year: i32,
    month: u32,
    data: &ImportData,
) -> WriteResult<ImportSummary> {
    let (start, end) = month_bounds(year, month)?;
    run_batch("replace_month", conn, |tx| {
        let records_deleted = tx.execute(
            "DELETE FROM time_records WHERE date >= ?1 AND date < ?2;",
            params![start, end],
        )?;
        let days_deleted = tx.execute(
            "DELETE FROM days WHERE date >= ?1 AND date < ?2;",
            params![start, end],
        )?;
        let summary = write_rows(tx, data)?;
        Ok(ImportSummary {
            days_deleted,
            records_deleted,
            ..summary
        })
    })
}

/// Returns `[first day of month, first day of next month)` as ISO dates.
pub fn month_bounds(year: i32, month: u32) -> WriteResult<(String, String)> {
    if !(1..=12).contains(&month) {
        return Err(WriteError::InvalidMonth { year, month });
    }
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    Ok((
        format!("{year:04}-{month:02}-01"),
        format!("{next_year:04}-{next_month:02}-01"),
    ))
}

fn run_batch(
    operation: &'static str,
    conn: &Connection,
    body: impl FnOnce(&Transaction<'_>) -> WriteResult<ImportSummary>,
) -> WriteResult<ImportSummary> {
    let started_at = Instant::now();
    ensure_schema_ready(conn)?;

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let result = body(&tx).and_then(|summary| {
        tx.commit()?;
        Ok(summary)
    });

    match &result {
        Ok(summary) => info!(
            "event=batch_write module=repo status=ok operation={} days={} records={} projects_inserted={} days_deleted={} duration_ms={}",
            operation,
            summary.days_written,
            summary.records_written,
            summary.projects_inserted,
            summary.days_deleted,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=batch_write module=repo status=error operation={} duration_ms={} error={}",
            operation,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn write_rows(conn: &Connection, data: &ImportData) -> WriteResult<ImportSummary> {
    for day in &data.days {
        upsert_day(conn, day)?;
        conn.prepare_cached("DELETE FROM time_records WHERE date = ?1;")?
            .execute([day.date.as_str()])?;
    }

    let mut resolver = ProjectResolver::new(conn);
    resolver.preload_and_resolve(data.records.iter().map(|record| record.project_path.as_str()))?;

    let mut stmt = conn.prepare_cached(
        "INSERT INTO time_records (
            logical_id,
            date,
            start_timestamp,
            end_timestamp,
            start_time,
            end_time,
            project_id,
            duration,
            remark
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(logical_id) DO UPDATE SET
            date = excluded.date,
            start_timestamp = excluded.start_timestamp,
            end_timestamp = excluded.end_timestamp,
            start_time = excluded.start_time,
            end_time = excluded.end_time,
            project_id = excluded.project_id,
            duration = excluded.duration,
            remark = excluded.remark;",
    )?;
    for record in &data.records {
        let project_id = resolver.get_id(&record.project_path)?;
        stmt.execute(params![
            record.logical_id,
            record.date.as_str(),
            record.start_timestamp,
            record.end_timestamp,
            record.start_time.as_str(),
            record.end_time.as_str(),
            project_id,
            record.duration_seconds,
            record.remark.as_deref(),
        ])?;
    }

    Ok(ImportSummary {
        days_written: data.days.len(),
        records_written: data.records.len(),
        projects_inserted: resolver.inserted_count(),
        ..ImportSummary::default()
    })
}

fn upsert_day(conn: &Connection, day: &DayRow) -> WriteResult<()> {
    let stats = &day.stats;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO days (
            date, year, month, status, exercise, sleep, getup_time, remark, activity_count,
            sleep_night_time, sleep_day_time, sleep_total_time, study_time,
            total_exercise_time, cardio_time, anaerobic_time, grooming_time, toilet_time,
            gaming_time, recreation_time, recreation_zhihu_time, recreation_bilibili_time,
            recreation_douyin_time
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18,
            ?19, ?20, ?21, ?22, ?23
        )
        ON CONFLICT(date) DO UPDATE SET
            year = excluded.year,
            month = excluded.month,
            status = excluded.status,
            exercise = excluded.exercise,
            sleep = excluded.sleep,
            getup_time = excluded.getup_time,
            remark = excluded.remark,
            activity_count = excluded.activity_count,
            sleep_night_time = excluded.sleep_night_time,
            sleep_day_time = excluded.sleep_day_time,
            sleep_total_time = excluded.sleep_total_time,
            study_time = excluded.study_time,
            total_exercise_time = excluded.total_exercise_time,
            cardio_time = excluded.cardio_time,
            anaerobic_time = excluded.anaerobic_time,
            grooming_time = excluded.grooming_time,
            toilet_time = excluded.toilet_time,
            gaming_time = excluded.gaming_time,
            recreation_time = excluded.recreation_time,
            recreation_zhihu_time = excluded.recreation_zhihu_time,
            recreation_bilibili_time = excluded.recreation_bilibili_time,
            recreation_douyin_time = excluded.recreation_douyin_time;",
    )?;
    stmt.execute(params![
        day.date.as_str(),
        day.year,
        day.month,
        day.status,
        day.exercise,
        day.sleep,
        day.getup_time.as_str(),
        day.remark.as_str(),
        day.activity_count as i64,
        stats.sleep_night_time,
        stats.sleep_day_time,
        stats.sleep_total_time,
        stats.study_time,
        stats.total_exercise_time,
        stats.cardio_time,
        stats.anaerobic_time,
        stats.grooming_time,
        stats.toilet_time,
        stats.gaming_time,
        stats.recreation_time,
        stats.recreation_zhihu_time,
        stats.recreation_bilibili_time,
        stats.recreation_douyin_time,
    ])?;
    Ok(())
}

/// Persisted time record joined with its project path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub logical_id: i64,
    pub start_time: String,
    pub end_time: String,
    pub duration_seconds: i64,
    pub project_path: String,
    pub remark: Option<String>,
}

/// Number of persisted days.
pub fn count_days(conn: &Connection) -> WriteResult<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM days;", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Number of persisted time records.
pub fn count_records(conn: &Connection) -> WriteResult<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM time_records;", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Loads one day's records ordered by logical id.
pub fn load_day_records(conn: &Connection, date: &str) -> WriteResult<Vec<StoredRecord>> {
    let mut stmt = conn.prepare(
        "SELECT r.logical_id, r.start_time, r.end_time, r.duration, p.full_path, r.remark
         FROM time_records r
         INNER JOIN projects p ON p.id = r.project_id
         WHERE r.date = ?1
         ORDER BY r.logical_id ASC;",
    )?;
    let rows = stmt.query_map([date], |row| {
        Ok(StoredRecord {
            logical_id: row.get(0)?,
            start_time: row.get(1)?,
            end_time: row.get(2)?,
            duration_seconds: row.get(3)?,
            project_path: row.get(4)?,
            remark: row.get(5)?,
        })
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::{month_bounds, ImportData, WriteError};
    use crate::model::day::{Activity, DayRecord};

    #[test]
    fn month_bounds_roll_december_into_next_year() {
        assert_eq!(
            month_bounds(2023, 12).unwrap(),
            ("2023-12-01".to_string(), "2024-01-01".to_string())
        );
        assert_eq!(
            month_bounds(2024, 2).unwrap(),
            ("2024-02-01".to_string(), "2024-03-01".to_string())
        );
        assert!(matches!(
            month_bounds(2024, 13),
            Err(WriteError::InvalidMonth { month: 13, .. })
        ));
    }

    #[test]
    fn import_data_uses_null_sentinel_for_continuation_days() {
        let mut day = DayRecord::new(2024, 5, 2);
        day.activities
            .push(Activity::new("01:00", "09:00", "sleep_night"));
        let data = ImportData::from_days([&day]);

        assert_eq!(data.days[0].getup_time, "Null");
        assert_eq!(data.days[0].activity_count, 1);
        assert_eq!(data.records[0].date, "2024-05-02");
    }
}
