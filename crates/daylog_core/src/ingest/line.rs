//! Line classification for the log format.
//!
//! # Responsibility
//! - Categorize one trimmed line without any surrounding state.
//! - Split event lines into time, description and trailing comment.
//!
//! # Invariants
//! - Classification is a pure function of the line text and remark prefix.
//! - Format validity (HHMM range) is checked here; recognizability of the
//!   description is not.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};

const COMMENT_DELIMITERS: &[&str] = &["//", "#", ";"];
const MINUTES_PER_DAY: i64 = 24 * 60;

static YEAR_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^y(\d{4})$").expect("valid regex"));
static DATE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})(\d{2})$").expect("valid regex"));
static EVENT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})(\d{2})(.+)$").expect("valid regex"));

/// One non-empty, trimmed source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLine<'a> {
    /// 1-based line number in the source file.
    pub number: usize,
    pub text: &'a str,
}

/// Iterates non-empty trimmed lines with their 1-based numbers.
pub fn raw_lines(contents: &str) -> impl Iterator<Item = RawLine<'_>> {
    contents
        .lines()
        .enumerate()
        .map(|(index, line)| RawLine {
            number: index + 1,
            text: line.trim_start_matches('\u{feff}').trim(),
        })
        .filter(|line| !line.text.is_empty())
}

/// Classification of one trimmed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `y` + 4 digits.
    Year(i32),
    /// 4 digits read as MMDD; not yet checked against the calendar.
    Date { month: u32, day: u32 },
    /// Remark text after the configured prefix.
    Remark(&'a str),
    /// 4 leading digits followed by more text.
    Event,
    Unrecognized,
}

/// Classifies a trimmed line.
pub fn classify<'a>(text: &'a str, remark_prefix: &str) -> LineKind<'a> {
    if let Some(captures) = YEAR_HEADER.captures(text) {
        if let Ok(year) = captures[1].parse() {
            return LineKind::Year(year);
        }
    }
    if let Some(captures) = DATE_HEADER.captures(text) {
        if let (Ok(month), Ok(day)) = (captures[1].parse(), captures[2].parse()) {
            return LineKind::Date { month, day };
        }
    }
    if let Some(rest) = text.strip_prefix(remark_prefix) {
        return LineKind::Remark(rest.trim());
    }
    if text == remark_prefix.trim_end() {
        return LineKind::Remark("");
    }
    if EVENT_LINE.is_match(text) {
        return LineKind::Event;
    }
    LineKind::Unrecognized
}

/// Parsed event line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLine {
    /// `HH:MM`; the end time of the described activity.
    pub time: String,
    pub description: String,
    /// Text after a comment delimiter, if any.
    pub remark: Option<String>,
}

/// Why an event-shaped line is not a valid event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFormatError {
    NotAnEvent,
    HourOutOfRange(u32),
    MinuteOutOfRange(u32),
    EmptyDescription,
}

impl Display for EventFormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnEvent => write!(f, "expected HHMM followed by a description"),
            Self::HourOutOfRange(hour) => write!(f, "hour {hour} is out of range 00-23"),
            Self::MinuteOutOfRange(minute) => write!(f, "minute {minute} is out of range 00-59"),
            Self::EmptyDescription => write!(f, "event description is empty"),
        }
    }
}

/// Parses an event line into time, description and comment remark.
pub fn parse_event(text: &str) -> Result<EventLine, EventFormatError> {
    let captures = EVENT_LINE
        .captures(text)
        .ok_or(EventFormatError::NotAnEvent)?;
    let hour: u32 = captures[1]
        .parse()
        .map_err(|_| EventFormatError::NotAnEvent)?;
    let minute: u32 = captures[2]
        .parse()
        .map_err(|_| EventFormatError::NotAnEvent)?;
    if hour > 23 {
        return Err(EventFormatError::HourOutOfRange(hour));
    }
    if minute > 59 {
        return Err(EventFormatError::MinuteOutOfRange(minute));
    }

    let rest = &captures[3];
    let (description, remark) = split_comment(rest);
    if description.is_empty() {
        return Err(EventFormatError::EmptyDescription);
    }

    Ok(EventLine {
        time: format!("{hour:02}:{minute:02}"),
        description: description.to_string(),
        remark: remark.map(str::to_string),
    })
}

fn split_comment(rest: &str) -> (&str, Option<&str>) {
    let cut = COMMENT_DELIMITERS
        .iter()
        .filter_map(|delimiter| rest.find(delimiter).map(|index| (index, delimiter.len())))
        .min_by_key(|(index, _)| *index);

    match cut {
        Some((index, len)) => {
            let remark = rest[index + len..].trim();
            (
                rest[..index].trim(),
                (!remark.is_empty()).then_some(remark),
            )
        }
        None => (rest.trim(), None),
    }
}

/// Converts `HH:MM` into minutes after midnight.
pub fn minutes_of(time: &str) -> Option<i64> {
    let (hour, minute) = time.split_once(':')?;
    let hour: i64 = hour.parse().ok()?;
    let minute: i64 = minute.parse().ok()?;
    if !(0..24).contains(&hour) || !(0..60).contains(&minute) {
        return None;
    }
    Some(hour * 60 + minute)
}

/// Minutes from `start` to `end`, wrapping past midnight when `end < start`.
pub fn span_minutes(start: &str, end: &str) -> Option<i64> {
    let delta = minutes_of(end)? - minutes_of(start)?;
    Some(if delta < 0 {
        delta + MINUTES_PER_DAY
    } else {
        delta
    })
}
