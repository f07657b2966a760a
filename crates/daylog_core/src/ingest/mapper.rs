//! Text and duration mapping from raw descriptions to project paths.
//!
//! # Responsibility
//! - Turn one day's raw events into contiguous activities.
//! - Resolve descriptions through text mappings, duration buckets and
//!   top-level aliases.
//!
//! # Invariants
//! - Each activity starts where the previous emitted one ended.
//! - A wake keyword never becomes an activity.
//! - Duration buckets use first-match over ascending thresholds.

use crate::config::{ConverterConfig, DurationRule};
use crate::ingest::line::span_minutes;
use crate::ingest::structure::RawEvent;
use crate::model::day::Activity;
use crate::model::validation::{ErrorKind, ValidationError};

/// Delimiter between project path segments.
pub const PATH_DELIMITER: char = '_';

/// Mapped activities of one day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedDay {
    /// Set when the day's first event is a wake keyword.
    pub getup_time: Option<String>,
    pub activities: Vec<Activity>,
    pub warnings: Vec<ValidationError>,
}

/// Accumulator threaded through the event fold.
#[derive(Debug, Clone, Default)]
struct Cursor {
    /// Start time for the next emitted activity.
    start: Option<String>,
    events_seen: usize,
}

enum Outcome {
    Wake(String),
    Emit(Activity),
    Drop(ValidationError),
}

/// Maps one day's raw events into activities.
pub fn map_day(events: &[RawEvent], config: &ConverterConfig) -> MappedDay {
    let (_, mapped) = events.iter().fold(
        (Cursor::default(), MappedDay::default()),
        |(cursor, mut mapped), event| {
            let (next, outcome) = map_event(cursor, event, config);
            match outcome {
                Outcome::Wake(time) => mapped.getup_time = Some(time),
                Outcome::Emit(activity) => mapped.activities.push(activity),
                Outcome::Drop(warning) => mapped.warnings.push(warning),
            }
            (next, mapped)
        },
    );
    mapped
}

fn map_event(cursor: Cursor, event: &RawEvent, config: &ConverterConfig) -> (Cursor, Outcome) {
    let is_first = cursor.events_seen == 0;
    let events_seen = cursor.events_seen + 1;

    if config.is_wake_keyword(&event.description) {
        if is_first {
            let next = Cursor {
                start: Some(event.time.clone()),
                events_seen,
            };
            return (next, Outcome::Wake(event.time.clone()));
        }
        let warning = ValidationError::new(
            event.line_number,
            ErrorKind::MisplacedWakeKeyword,
            format!(
                "wake keyword `{}` after the first event is ignored",
                event.description
            ),
        );
        let next = Cursor {
            start: cursor.start,
            events_seen,
        };
        return (next, Outcome::Drop(warning));
    }

    let next = Cursor {
        start: Some(event.time.clone()),
        events_seen,
    };
    let Some(start) = cursor.start.filter(|start| !start.is_empty()) else {
        let warning = ValidationError::new(
            event.line_number,
            ErrorKind::DroppedLeadActivity,
            format!(
                "`{}` has no start time on a day without a wake event and is dropped",
                event.description
            ),
        );
        return (next, Outcome::Drop(warning));
    };

    let minutes = span_minutes(&start, &event.time);
    let project_path = resolve_project_path(&event.description, minutes, config);
    let activity =
        Activity::new(start, event.time.clone(), project_path).with_remark(event.remark.clone());
    (next, Outcome::Emit(activity))
}

/// Resolves a raw description into its canonical project path.
///
/// `minutes` is the activity duration; duration rules are skipped when it is
/// unknown.
pub fn resolve_project_path(
    description: &str,
    minutes: Option<i64>,
    config: &ConverterConfig,
) -> String {
    let mut name = config
        .text_mappings
        .get(description)
        .map(String::as_str)
        .unwrap_or(description);
    if let Some(mapped) = config.text_duration_mappings.get(name) {
        name = mapped.as_str();
    }
    if let (Some(rules), Some(minutes)) = (config.duration_rules.get(name), minutes) {
        if let Some(replacement) = remap_by_duration(rules, minutes) {
            name = replacement;
        }
    }
    apply_top_parent_alias(name, config)
}

/// Returns the replacement of the first rule whose threshold exceeds `minutes`.
pub fn remap_by_duration(rules: &[DurationRule], minutes: i64) -> Option<&str> {
    debug_assert!(
        rules
            .windows(2)
            .all(|pair| pair[0].less_than_minutes < pair[1].less_than_minutes),
        "duration rules must be ascending"
    );
    rules
        .iter()
        .find(|rule| minutes < i64::from(rule.less_than_minutes))
        .map(|rule| rule.replacement.as_str())
}

fn apply_top_parent_alias(name: &str, config: &ConverterConfig) -> String {
    let (head, tail) = match name.split_once(PATH_DELIMITER) {
        Some((head, tail)) => (head, Some(tail)),
        None => (name, None),
    };
    let head = config
        .top_parent_aliases
        .get(head)
        .map(String::as_str)
        .unwrap_or(head);
    match tail {
        Some(tail) => format!("{head}{PATH_DELIMITER}{tail}"),
        None => head.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{map_day, remap_by_duration, resolve_project_path};
    use crate::config::{ConverterConfig, DurationRule};
    use crate::ingest::structure::RawEvent;
    use crate::model::validation::ErrorKind;

    fn event(line_number: usize, time: &str, description: &str) -> RawEvent {
        RawEvent {
            line_number,
            time: time.to_string(),
            description: description.to_string(),
            remark: None,
        }
    }

    fn rules() -> Vec<DurationRule> {
        vec![
            DurationRule {
                less_than_minutes: 30,
                replacement: "short".to_string(),
            },
            DurationRule {
                less_than_minutes: 90,
                replacement: "medium".to_string(),
            },
        ]
    }

    #[test]
    fn duration_rule_takes_first_exceeding_threshold() {
        assert_eq!(remap_by_duration(&rules(), 45), Some("medium"));
        assert_eq!(remap_by_duration(&rules(), 10), Some("short"));
        assert_eq!(remap_by_duration(&rules(), 90), None);
    }

    #[test]
    fn mappings_chain_then_alias_top_segment() {
        let mut config = ConverterConfig::default();
        config
            .text_mappings
            .insert("bili".to_string(), "rest_bilibili".to_string());
        config
            .top_parent_aliases
            .insert("rest".to_string(), "recreation".to_string());
        config
            .text_duration_mappings
            .insert("nap".to_string(), "rest_nap".to_string());
        config.duration_rules.insert(
            "rest_nap".to_string(),
            vec![DurationRule {
                less_than_minutes: 60,
                replacement: "sleep_day".to_string(),
            }],
        );

        assert_eq!(
            resolve_project_path("bili", Some(20), &config),
            "recreation_bilibili"
        );
        assert_eq!(resolve_project_path("nap", Some(40), &config), "sleep_day");
        assert_eq!(
            resolve_project_path("nap", Some(120), &config),
            "recreation_nap"
        );
    }

    #[test]
    fn first_wake_keyword_sets_getup_without_activity() {
        let config = ConverterConfig::default();
        let mapped = map_day(
            &[
                event(3, "07:00", "getup"),
                event(4, "07:20", "routine_grooming"),
                event(5, "09:00", "study_math"),
            ],
            &config,
        );

        assert_eq!(mapped.getup_time.as_deref(), Some("07:00"));
        assert_eq!(mapped.activities.len(), 2);
        assert_eq!(mapped.activities[0].start_time, "07:00");
        assert_eq!(mapped.activities[1].start_time, "07:20");
        assert_eq!(mapped.activities[1].end_time, "09:00");
    }

    #[test]
    fn mid_day_wake_keyword_is_dropped_with_warning() {
        let config = ConverterConfig::default();
        let mapped = map_day(
            &[
                event(3, "07:00", "getup"),
                event(4, "08:00", "study_math"),
                event(5, "08:10", "getup"),
                event(6, "09:00", "study_math"),
            ],
            &config,
        );

        assert_eq!(mapped.activities.len(), 2);
        assert_eq!(mapped.activities[1].start_time, "08:00");
        assert_eq!(mapped.warnings[0].kind, ErrorKind::MisplacedWakeKeyword);
    }

    #[test]
    fn continuation_day_drops_lead_activity() {
        let config = ConverterConfig::default();
        let mapped = map_day(
            &[
                event(3, "01:00", "recreation_game"),
                event(4, "09:00", "sleep_night"),
                event(5, "10:00", "study_math"),
            ],
            &config,
        );

        assert_eq!(mapped.getup_time, None);
        assert_eq!(mapped.activities.len(), 2);
        assert_eq!(mapped.activities[0].start_time, "01:00");
        assert_eq!(mapped.warnings[0].kind, ErrorKind::DroppedLeadActivity);
    }
}
