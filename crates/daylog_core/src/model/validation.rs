//! Validation diagnostics shared by the structural and semantic validators.
//!
//! # Invariants
//! - A report never holds two entries with the same `(line, message, kind)`.
//! - Iteration order is `line ASC, message ASC, kind ASC`.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Broad origin of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCategory {
    /// File shape violations; the file's records are not trusted.
    Structural,
    /// Recoverable content problems recorded while parsing continues.
    Source,
    /// Post-parse checks over converted days.
    Semantic,
    /// Unreadable input.
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
}

/// Concrete diagnostic kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    MissingYearHeader,
    NonSequentialYear,
    InvalidDate,
    DuplicateDate,
    UnrecognizedLineFormat,
    LineOutsideDay,
    RemarkAfterEvent,
    UnrecognizedActivity,
    MisplacedWakeKeyword,
    DroppedLeadActivity,
    TimeDiscontinuity,
    MissingSleepNight,
    TooFewActivities,
    DateGap,
    FileUnreadable,
}

impl ErrorKind {
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::MissingYearHeader
            | Self::NonSequentialYear
            | Self::InvalidDate
            | Self::DuplicateDate
            | Self::UnrecognizedLineFormat
            | Self::LineOutsideDay => ErrorCategory::Structural,
            Self::RemarkAfterEvent
            | Self::UnrecognizedActivity
            | Self::MisplacedWakeKeyword
            | Self::DroppedLeadActivity => ErrorCategory::Source,
            Self::TimeDiscontinuity
            | Self::MissingSleepNight
            | Self::TooFewActivities
            | Self::DateGap => ErrorCategory::Semantic,
            Self::FileUnreadable => ErrorCategory::Io,
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::UnrecognizedActivity
            | Self::MisplacedWakeKeyword
            | Self::DroppedLeadActivity
            | Self::TooFewActivities => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Stable snake_case name used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingYearHeader => "missing_year_header",
            Self::NonSequentialYear => "non_sequential_year",
            Self::InvalidDate => "invalid_date",
            Self::DuplicateDate => "duplicate_date",
            Self::UnrecognizedLineFormat => "unrecognized_line_format",
            Self::LineOutsideDay => "line_outside_day",
            Self::RemarkAfterEvent => "remark_after_event",
            Self::UnrecognizedActivity => "unrecognized_activity",
            Self::MisplacedWakeKeyword => "misplaced_wake_keyword",
            Self::DroppedLeadActivity => "dropped_lead_activity",
            Self::TimeDiscontinuity => "time_discontinuity",
            Self::MissingSleepNight => "missing_sleep_night",
            Self::TooFewActivities => "too_few_activities",
            Self::DateGap => "date_gap",
            Self::FileUnreadable => "file_unreadable",
        }
    }
}

/// Character range inside the offending line (0-based, end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

/// One validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// 1-based source line; `0` means the whole file.
    pub line_number: usize,
    pub message: String,
    pub kind: ErrorKind,
    pub span: Option<LineSpan>,
}

impl ValidationError {
    pub fn new(line_number: usize, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            line_number,
            message: message.into(),
            kind,
            span: None,
        }
    }

    /// Creates a whole-file diagnostic.
    pub fn file_level(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(0, kind, message)
    }

    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.span = Some(LineSpan { start, end });
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity() {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if self.line_number == 0 {
            write!(f, "{level}[{}]: {}", self.kind.as_str(), self.message)
        } else {
            write!(
                f,
                "line {}: {level}[{}]: {}",
                self.line_number,
                self.kind.as_str(),
                self.message
            )
        }
    }
}

/// Ordered, deduplicating collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    entries: BTreeMap<(usize, String, ErrorKind), ValidationError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts one diagnostic; returns `false` when an equal key was present.
    pub fn push(&mut self, error: ValidationError) -> bool {
        let key = (error.line_number, error.message.clone(), error.kind);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, error);
        true
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = ValidationError>) {
        for error in errors {
            self.push(error);
        }
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.iter().any(|error| error.kind == kind)
    }

    pub fn error_count(&self) -> usize {
        self.iter()
            .filter(|error| error.severity() == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.len() - self.error_count()
    }

    /// Returns `true` when the file's records must not be trusted.
    pub fn is_blocking(&self) -> bool {
        self.iter().any(|error| {
            error.kind.category() == ErrorCategory::Structural
                && error.severity() == Severity::Error
        })
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.entries.into_values().collect()
    }
}

impl IntoIterator for ValidationReport {
    type Item = ValidationError;
    type IntoIter = std::collections::btree_map::IntoValues<(usize, String, ErrorKind), ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}
