//! Structural validation state machine.
//!
//! # Responsibility
//! - Walk a file's lines in order and enforce header/ordering rules.
//! - Collect raw day blocks for the converter from the same walk.
//!
//! # Invariants
//! - The first non-empty line must be a year header; anything else aborts
//!   the walk with a single fatal error.
//! - Every other violation is recorded and the walk continues.
//! - `validate_structure` has no side effects beyond its return value.

use crate::config::ConverterConfig;
use crate::ingest::line::{classify, parse_event, raw_lines, EventFormatError, EventLine, LineKind, RawLine};
use crate::model::validation::{ErrorKind, ValidationError, ValidationReport};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};

/// Validator state between two lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorState {
    /// Nothing accepted yet; only a year header is legal.
    ExpectYear,
    /// A year is active but no valid date block is open.
    ExpectDateOrYear { year: i32 },
    /// Inside the block of one calendar day.
    InDayBlock {
        year: i32,
        month: u32,
        day: u32,
        event_seen: bool,
    },
}

impl ValidatorState {
    fn year(&self) -> Option<i32> {
        match self {
            Self::ExpectYear => None,
            Self::ExpectDateOrYear { year } | Self::InDayBlock { year, .. } => Some(*year),
        }
    }
}

/// What a line contributed once accepted by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accepted<'a> {
    Year(i32),
    DayStart { year: i32, month: u32, day: u32 },
    Remark(&'a str),
    Event(EventLine),
    Nothing,
}

/// Result of feeding one line to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<'a> {
    pub state: ValidatorState,
    pub errors: Vec<ValidationError>,
    pub accepted: Accepted<'a>,
}

/// Read-only lookup data shared by every transition of one walk.
pub struct StructureContext<'a> {
    pub config: &'a ConverterConfig,
    pub keywords: BTreeSet<String>,
}

impl<'a> StructureContext<'a> {
    pub fn new(config: &'a ConverterConfig) -> Self {
        Self {
            config,
            keywords: config.recognized_keywords(),
        }
    }
}

/// Applies one line to `state`.
///
/// Returns `Err` only for the fatal missing-year-header violation.
pub fn transition<'a>(
    state: ValidatorState,
    line: RawLine<'a>,
    ctx: &StructureContext<'_>,
) -> Result<Transition<'a>, ValidationError> {
    let kind = classify(line.text, &ctx.config.remark_prefix);

    let Some(current_year) = state.year() else {
        return match kind {
            LineKind::Year(year) => Ok(Transition {
                state: ValidatorState::ExpectDateOrYear { year },
                errors: Vec::new(),
                accepted: Accepted::Year(year),
            }),
            _ => Err(ValidationError::new(
                line.number,
                ErrorKind::MissingYearHeader,
                format!(
                    "file must start with a year header such as `y2024`, found `{}`",
                    line.text
                ),
            )),
        };
    };

    let mut errors = Vec::new();
    let (next, accepted) = match kind {
        LineKind::Year(year) => {
            if year != current_year && year != current_year + 1 {
                errors.push(
                    ValidationError::new(
                        line.number,
                        ErrorKind::NonSequentialYear,
                        format!("year {year} does not follow year {current_year}"),
                    )
                    .with_span(0, line.text.chars().count()),
                );
            }
            (ValidatorState::ExpectDateOrYear { year }, Accepted::Year(year))
        }
        LineKind::Date { month, day } => {
            if NaiveDate::from_ymd_opt(current_year, month, day).is_some() {
                (
                    ValidatorState::InDayBlock {
                        year: current_year,
                        month,
                        day,
                        event_seen: false,
                    },
                    Accepted::DayStart {
                        year: current_year,
                        month,
                        day,
                    },
                )
            } else {
                errors.push(
                    ValidationError::new(
                        line.number,
                        ErrorKind::InvalidDate,
                        format!(
                            "`{}` is not a calendar date in year {current_year}",
                            line.text
                        ),
                    )
                    .with_span(0, 4),
                );
                (
                    ValidatorState::ExpectDateOrYear { year: current_year },
                    Accepted::Nothing,
                )
            }
        }
        LineKind::Remark(text) => match state {
            ValidatorState::InDayBlock {
                event_seen: true, ..
            } => {
                errors.push(ValidationError::new(
                    line.number,
                    ErrorKind::RemarkAfterEvent,
                    "remark lines must precede the first event of the day",
                ));
                (state, Accepted::Nothing)
            }
            ValidatorState::InDayBlock { .. } => (state, Accepted::Remark(text)),
            _ => {
                errors.push(outside_day(line));
                (state, Accepted::Nothing)
            }
        },
        LineKind::Event => match parse_event(line.text) {
            Err(err) => {
                errors.push(format_error(line, err));
                (state, Accepted::Nothing)
            }
            Ok(event) => match state {
                ValidatorState::InDayBlock {
                    year,
                    month,
                    day,
                    event_seen,
                } => {
                    if let Some(warning) = recognizability(line, &event, event_seen, ctx) {
                        errors.push(warning);
                    }
                    (
                        ValidatorState::InDayBlock {
                            year,
                            month,
                            day,
                            event_seen: true,
                        },
                        Accepted::Event(event),
                    )
                }
                _ => {
                    errors.push(outside_day(line));
                    (state, Accepted::Nothing)
                }
            },
        },
        LineKind::Unrecognized => {
            errors.push(
                ValidationError::new(
                    line.number,
                    ErrorKind::UnrecognizedLineFormat,
                    format!("unrecognized line format: `{}`", line.text),
                )
                .with_span(0, line.text.chars().count()),
            );
            (state, Accepted::Nothing)
        }
    };

    Ok(Transition {
        state: next,
        errors,
        accepted,
    })
}

fn outside_day(line: RawLine<'_>) -> ValidationError {
    ValidationError::new(
        line.number,
        ErrorKind::LineOutsideDay,
        format!("`{}` appears before any date header", line.text),
    )
}

fn format_error(line: RawLine<'_>, err: EventFormatError) -> ValidationError {
    let error = ValidationError::new(
        line.number,
        ErrorKind::UnrecognizedLineFormat,
        format!("unrecognized line format: {err}"),
    );
    match err {
        EventFormatError::HourOutOfRange(_) => error.with_span(0, 2),
        EventFormatError::MinuteOutOfRange(_) => error.with_span(2, 4),
        EventFormatError::EmptyDescription | EventFormatError::NotAnEvent => {
            error.with_span(0, line.text.chars().count())
        }
    }
}

fn recognizability(
    line: RawLine<'_>,
    event: &EventLine,
    event_seen: bool,
    ctx: &StructureContext<'_>,
) -> Option<ValidationError> {
    let span_end = line.text.chars().count();
    if !event_seen && !ctx.config.is_wake_keyword(&event.description) {
        return Some(
            ValidationError::new(
                line.number,
                ErrorKind::UnrecognizedActivity,
                format!(
                    "first event of the day `{}` is not a wake keyword",
                    event.description
                ),
            )
            .with_span(4, span_end),
        );
    }
    if !ctx.keywords.contains(&event.description) {
        return Some(
            ValidationError::new(
                line.number,
                ErrorKind::UnrecognizedActivity,
                format!("unrecognized activity `{}`", event.description),
            )
            .with_span(4, span_end),
        );
    }
    None
}

/// Walks every line, reporting diagnostics and handing accepted lines to `on_accept`.
pub fn walk<'a>(
    contents: &'a str,
    config: &ConverterConfig,
    mut on_accept: impl FnMut(RawLine<'a>, Accepted<'a>),
) -> ValidationReport {
    let ctx = StructureContext::new(config);
    let mut report = ValidationReport::new();
    let mut state = ValidatorState::ExpectYear;
    let mut seen_dates = HashSet::new();

    for line in raw_lines(contents) {
        match transition(state, line, &ctx) {
            Err(fatal) => {
                report.push(fatal);
                break;
            }
            Ok(step) => {
                report.extend(step.errors);
                if let Accepted::DayStart { year, month, day } = step.accepted {
                    if !seen_dates.insert((year, month, day)) {
                        report.push(ValidationError::new(
                            line.number,
                            ErrorKind::DuplicateDate,
                            format!("date {year:04}-{month:02}-{day:02} appears more than once"),
                        ));
                    }
                }
                state = step.state;
                on_accept(line, step.accepted);
            }
        }
    }

    report
}

/// Runs structural validation only.
pub fn validate_structure(contents: &str, config: &ConverterConfig) -> ValidationReport {
    walk(contents, config, |_, _| {})
}

/// One event as written in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub line_number: usize,
    /// `HH:MM` end time.
    pub time: String,
    pub description: String,
    pub remark: Option<String>,
}

/// One date block as written in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDay {
    pub line_number: usize,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub remarks: Vec<String>,
    pub events: Vec<RawEvent>,
}

/// Raw day blocks plus the structural report of one file.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub days: Vec<RawDay>,
    pub report: ValidationReport,
}

/// Runs the structural walk and collects day blocks.
pub fn parse_days(contents: &str, config: &ConverterConfig) -> ParsedFile {
    let mut days: Vec<RawDay> = Vec::new();
    let report = walk(contents, config, |line, accepted| match accepted {
        Accepted::DayStart { year, month, day } => days.push(RawDay {
            line_number: line.number,
            year,
            month,
            day,
            remarks: Vec::new(),
            events: Vec::new(),
        }),
        Accepted::Remark(text) if !text.is_empty() => {
            if let Some(current) = days.last_mut() {
                current.remarks.push(text.to_string());
            }
        }
        Accepted::Event(event) => {
            if let Some(current) = days.last_mut() {
                current.events.push(RawEvent {
                    line_number: line.number,
                    time: event.time,
                    description: event.description,
                    remark: event.remark,
                });
            }
        }
        Accepted::Remark(_) | Accepted::Year(_) | Accepted::Nothing => {}
    });

    ParsedFile { days, report }
}
