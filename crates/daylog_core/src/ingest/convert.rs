//! Single-file conversion entry point.
//!
//! # Responsibility
//! - Run structural parse, mapping, stats, in-file sleep linking and
//!   semantic validation for one source file.
//!
//! # Invariants
//! - Processing of one file is strictly sequential.
//! - Returned days are sorted by date and carry up-to-date stats.
//! - A blocking report means the caller must not trust the days.

use crate::config::{ConfigError, ConverterConfig};
use crate::ingest::linker::{link_adjacent, DayTail};
use crate::ingest::mapper::map_day;
use crate::ingest::semantic::{check_date_continuity, validate_day};
use crate::ingest::stats::compute_day_stats;
use crate::ingest::structure::{self, RawDay};
use crate::model::day::{DayRecord, MonthKey};
use crate::model::validation::ValidationReport;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Converted days and every diagnostic of one file.
#[derive(Debug, Clone, Default)]
pub struct Conversion {
    pub days: Vec<DayRecord>,
    pub report: ValidationReport,
}

impl Conversion {
    /// Returns `true` when no structural error was found.
    pub fn is_trusted(&self) -> bool {
        !self.report.is_blocking()
    }
}

/// Converter bound to one validated configuration.
#[derive(Debug, Clone)]
pub struct Converter {
    config: ConverterConfig,
}

impl Converter {
    /// Creates a converter after validating `config`.
    pub fn new(config: ConverterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Structural validation only; no conversion work is done.
    pub fn validate_structure(&self, contents: &str) -> ValidationReport {
        structure::validate_structure(contents, &self.config)
    }

    /// Converts one file's contents.
    pub fn convert(&self, contents: &str) -> Conversion {
        let started_at = Instant::now();
        let parsed = structure::parse_days(contents, &self.config);
        let mut report = parsed.report;

        let mut anchored: Vec<(usize, DayRecord)> = parsed
            .days
            .iter()
            .map(|raw| (raw.line_number, self.build_day(raw, &mut report)))
            .collect();
        anchored.sort_by(|(_, left), (_, right)| left.date.cmp(&right.date));

        let sleep_path = self.config.sleep_path();
        for index in 1..anchored.len() {
            let tail = DayTail::of(&anchored[index - 1].1);
            if let Err(err) = link_adjacent(&tail, &mut anchored[index].1, sleep_path) {
                warn!("event=sleep_link module=convert status=error error={}", err);
            }
        }

        let mut months: BTreeMap<MonthKey, BTreeSet<u32>> = BTreeMap::new();
        for (line_number, day) in &anchored {
            report.extend(validate_day(day, sleep_path, *line_number));
            if let Some(day_of_month) = day.day_of_month() {
                months.entry(day.month_key()).or_default().insert(day_of_month);
            }
        }
        for (month, days_seen) in &months {
            report.extend(check_date_continuity(
                month.year,
                month.month,
                days_seen,
                self.config.date_check_mode,
            ));
        }

        let days: Vec<DayRecord> = anchored.into_iter().map(|(_, day)| day).collect();
        debug!(
            "event=convert module=convert status=ok days={} errors={} warnings={} duration_ms={}",
            days.len(),
            report.error_count(),
            report.warning_count(),
            started_at.elapsed().as_millis()
        );
        Conversion { days, report }
    }

    fn build_day(&self, raw: &RawDay, report: &mut ValidationReport) -> DayRecord {
        let mut day = DayRecord::new(raw.year, raw.month, raw.day);
        day.remark = raw.remarks.join("\n");

        let mapped = map_day(&raw.events, &self.config);
        report.extend(mapped.warnings);
        day.getup_time = mapped.getup_time;
        day.activities = mapped.activities;
        day.has_sleep = day.has_activity_under("sleep");

        if let Err(err) = compute_day_stats(&mut day) {
            warn!(
                "event=day_stats module=convert status=error line={} error={}",
                raw.line_number, err
            );
        }
        day
    }
}
