//! Multi-file conversion and import pipeline.
//!
//! # Responsibility
//! - Read every source up front, then convert sources in parallel.
//! - Merge trusted days into month buckets and link month boundaries.
//! - Hand the finalized days to the batch writer.
//!
//! # Invariants
//! - No source is converted unless every source was read.
//! - Sources with a blocking report contribute no days.
//! - The merged result does not depend on thread scheduling: a date seen in
//!   several sources keeps the day from the earliest source.

use crate::ingest::convert::Converter;
use crate::ingest::linker::link_and_finalize;
use crate::model::day::{DayRecord, MonthKey};
use crate::model::validation::{ErrorKind, ValidationError, ValidationReport};
use crate::repo::day_repo::{self, ImportData, ImportSummary, WriteError};
use log::{info, warn};
use parking_lot::Mutex;
use rayon::prelude::*;
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug)]
pub enum PipelineError {
    Io { path: PathBuf, source: std::io::Error },
    Write(WriteError),
}

impl Display for PipelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read `{}`: {source}", path.display())
            }
            Self::Write(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Write(err) => Some(err),
        }
    }
}

impl From<WriteError> for PipelineError {
    fn from(value: WriteError) -> Self {
        Self::Write(value)
    }
}

impl PipelineError {
    /// Converts an I/O failure into the diagnostic shown next to other reports.
    pub fn to_validation_error(&self) -> Option<ValidationError> {
        match self {
            Self::Io { path, source } => Some(ValidationError::file_level(
                ErrorKind::FileUnreadable,
                format!("cannot read `{}`: {source}", path.display()),
            )),
            Self::Write(_) => None,
        }
    }
}

/// One input file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub contents: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Reads all `paths`; the first unreadable file aborts the whole run.
pub fn read_sources<P: AsRef<Path>>(paths: &[P]) -> PipelineResult<Vec<SourceFile>> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            std::fs::read_to_string(path)
                .map(|contents| SourceFile::new(path.display().to_string(), contents))
                .map_err(|source| PipelineError::Io {
                    path: path.to_path_buf(),
                    source,
                })
        })
        .collect()
}

/// Diagnostics of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub name: String,
    pub report: ValidationReport,
    /// `false` when structural errors kept the source's days out.
    pub accepted: bool,
    pub day_count: usize,
}

/// Linked month buckets plus per-source diagnostics in input order.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub months: BTreeMap<MonthKey, Vec<DayRecord>>,
    pub outcomes: Vec<SourceOutcome>,
}

impl PipelineOutput {
    /// Every merged day in date order.
    pub fn days(&self) -> impl Iterator<Item = &DayRecord> {
        self.months.values().flatten()
    }

    pub fn rejected(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.accepted)
    }

    pub fn import_data(&self) -> ImportData {
        ImportData::from_days(self.days())
    }
}

/// Converts `sources` in parallel, merges them by month and links month
/// boundaries.
pub fn convert_sources(converter: &Converter, sources: &[SourceFile]) -> PipelineOutput {
    let started_at = Instant::now();
    let merged: Mutex<BTreeMap<MonthKey, Vec<(usize, DayRecord)>>> = Mutex::new(BTreeMap::new());

    let outcomes: Vec<SourceOutcome> = sources
        .par_iter()
        .enumerate()
        .map(|(source_index, source)| {
            let conversion = converter.convert(&source.contents);
            let accepted = conversion.is_trusted();
            let day_count = conversion.days.len();
            if accepted {
                let mut buckets = merged.lock();
                for day in conversion.days {
                    buckets
                        .entry(day.month_key())
                        .or_default()
                        .push((source_index, day));
                }
            } else {
                warn!(
                    "event=source_rejected module=service status=error source={} errors={}",
                    source.name,
                    conversion.report.error_count()
                );
            }
            SourceOutcome {
                name: source.name.clone(),
                report: conversion.report,
                accepted,
                day_count,
            }
        })
        .collect();

    let buckets = merged
        .into_inner()
        .into_iter()
        .map(|(month, days)| (month, dedup_by_date(month, days, sources)))
        .collect();
    let months = link_and_finalize(buckets, converter.config());

    info!(
        "event=convert_sources module=service status=ok sources={} rejected={} months={} duration_ms={}",
        sources.len(),
        outcomes.iter().filter(|outcome| !outcome.accepted).count(),
        months.len(),
        started_at.elapsed().as_millis()
    );
    PipelineOutput { months, outcomes }
}

fn dedup_by_date(
    month: MonthKey,
    mut days: Vec<(usize, DayRecord)>,
    sources: &[SourceFile],
) -> Vec<DayRecord> {
    days.sort_by(|(left_source, left), (right_source, right)| {
        left.date
            .cmp(&right.date)
            .then(left_source.cmp(right_source))
    });

    let mut kept: Vec<DayRecord> = Vec::with_capacity(days.len());
    for (source_index, day) in days {
        if kept.last().is_some_and(|last| last.date == day.date) {
            warn!(
                "event=duplicate_day module=service status=skipped month={} date={} source={}",
                month, day.date, sources[source_index].name
            );
            continue;
        }
        kept.push(day);
    }
    kept
}

/// Converts `sources` and upserts every merged day.
pub fn import_sources(
    conn: &Connection,
    converter: &Converter,
    sources: &[SourceFile],
) -> PipelineResult<(PipelineOutput, ImportSummary)> {
    let output = convert_sources(converter, sources);
    let summary = day_repo::import(conn, &output.import_data())?;
    Ok((output, summary))
}

/// Converts `sources` and replaces `month` with the merged days of that month.
///
/// Days of other months are converted (they may feed the boundary link) but
/// not written.
pub fn replace_month_from_sources(
    conn: &Connection,
    converter: &Converter,
    sources: &[SourceFile],
    month: MonthKey,
) -> PipelineResult<(PipelineOutput, ImportSummary)> {
    let output = convert_sources(converter, sources);
    let data = ImportData::from_days(output.months.get(&month).into_iter().flatten());
    let summary = day_repo::replace_month(conn, month.year, month.month, &data)?;
    Ok((output, summary))
}
