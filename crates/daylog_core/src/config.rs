//! Resolved converter configuration.
//!
//! # Responsibility
//! - Hold the already-parsed mapping tables the converter consumes.
//! - Reject configurations whose duration rules break the bucket contract.
//!
//! # Invariants
//! - Duration rules of one name are strictly ascending by threshold.
//! - Remark prefix and wake keyword set are never empty.
//!
//! Loading the document from disk belongs to the caller; this type only needs
//! to be deserializable.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Project path used for synthesized overnight sleep when none is configured.
pub const DEFAULT_GENERATED_SLEEP_PATH: &str = "sleep_night";
/// Remark line prefix used when none is configured.
pub const DEFAULT_REMARK_PREFIX: &str = "r ";
/// Wake keyword used when none is configured.
pub const DEFAULT_WAKE_KEYWORD: &str = "getup";

/// How strictly the day sequence of one month is checked for gaps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateCheckMode {
    /// No date continuity check.
    #[default]
    None,
    /// Days `1..=max_day_seen` must all be present.
    Continuity,
    /// Every day of the calendar month must be present.
    Full,
}

/// One duration-conditioned remapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRule {
    /// Applies when the activity lasted strictly less than this many minutes.
    pub less_than_minutes: u32,
    /// Replacement activity name.
    pub replacement: String,
}

/// Configuration consumed by the conversion pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Prefix that marks a remark line inside a day block.
    pub remark_prefix: String,
    /// Descriptions that mark the wake-up event of a day.
    pub wake_keywords: BTreeSet<String>,
    /// Raw description to canonical name.
    pub text_mappings: BTreeMap<String, String>,
    /// Canonical name to second-stage canonical name.
    pub text_duration_mappings: BTreeMap<String, String>,
    /// Canonical name to ascending duration buckets.
    pub duration_rules: BTreeMap<String, Vec<DurationRule>>,
    /// First path segment aliases, e.g. `rest -> recreation`.
    pub top_parent_aliases: BTreeMap<String, String>,
    /// Project path for synthesized overnight sleep.
    pub generated_sleep_path: Option<String>,
    /// Date continuity check applied per month.
    pub date_check_mode: DateCheckMode,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            remark_prefix: DEFAULT_REMARK_PREFIX.to_string(),
            wake_keywords: BTreeSet::from([DEFAULT_WAKE_KEYWORD.to_string()]),
            text_mappings: BTreeMap::new(),
            text_duration_mappings: BTreeMap::new(),
            duration_rules: BTreeMap::new(),
            top_parent_aliases: BTreeMap::new(),
            generated_sleep_path: None,
            date_check_mode: DateCheckMode::None,
        }
    }
}

impl ConverterConfig {
    /// Checks declaration-level invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remark_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyRemarkPrefix);
        }
        if self.wake_keywords.iter().all(|keyword| keyword.trim().is_empty()) {
            return Err(ConfigError::MissingWakeKeywords);
        }
        if let Some(path) = &self.generated_sleep_path {
            if path.trim().is_empty() {
                return Err(ConfigError::EmptyGeneratedSleepPath);
            }
        }

        for (name, rules) in &self.duration_rules {
            for pair in rules.windows(2) {
                if pair[1].less_than_minutes <= pair[0].less_than_minutes {
                    return Err(ConfigError::UnsortedDurationRules {
                        name: name.clone(),
                        previous: pair[0].less_than_minutes,
                        next: pair[1].less_than_minutes,
                    });
                }
            }
        }
        Ok(())
    }

    /// Returns the project path used for synthesized overnight sleep.
    pub fn sleep_path(&self) -> &str {
        self.generated_sleep_path
            .as_deref()
            .unwrap_or(DEFAULT_GENERATED_SLEEP_PATH)
    }

    pub fn is_wake_keyword(&self, description: &str) -> bool {
        self.wake_keywords.contains(description)
    }

    /// Builds the keyword set an event description is checked against.
    ///
    /// Covers wake keywords plus every key and value of the mapping tables,
    /// so already-canonical descriptions are recognized too.
    pub fn recognized_keywords(&self) -> BTreeSet<String> {
        let mut keywords = self.wake_keywords.clone();
        for (raw, canonical) in self
            .text_mappings
            .iter()
            .chain(self.text_duration_mappings.iter())
        {
            keywords.insert(raw.clone());
            keywords.insert(canonical.clone());
        }
        for (name, rules) in &self.duration_rules {
            keywords.insert(name.clone());
            keywords.extend(rules.iter().map(|rule| rule.replacement.clone()));
        }
        keywords.insert(self.sleep_path().to_string());
        keywords
    }
}

/// Configuration rejected by [`ConverterConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyRemarkPrefix,
    MissingWakeKeywords,
    EmptyGeneratedSleepPath,
    /// Duration rules of `name` are not strictly ascending.
    UnsortedDurationRules {
        name: String,
        previous: u32,
        next: u32,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRemarkPrefix => write!(f, "remark prefix must not be blank"),
            Self::MissingWakeKeywords => write!(f, "at least one wake keyword is required"),
            Self::EmptyGeneratedSleepPath => {
                write!(f, "generated sleep path must not be blank when set")
            }
            Self::UnsortedDurationRules {
                name,
                previous,
                next,
            } => write!(
                f,
                "duration rules for `{name}` must be strictly ascending, got {previous} then {next}"
            ),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ConverterConfig, DateCheckMode, DurationRule};

    fn rule(less_than_minutes: u32, replacement: &str) -> DurationRule {
        DurationRule {
            less_than_minutes,
            replacement: replacement.to_string(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = ConverterConfig::default();
        config.validate().expect("default config should validate");
        assert_eq!(config.sleep_path(), "sleep_night");
        assert!(config.is_wake_keyword("getup"));
    }

    #[test]
    fn unsorted_duration_rules_are_rejected() {
        let mut config = ConverterConfig::default();
        config.duration_rules.insert(
            "nap".to_string(),
            vec![rule(90, "sleep_day"), rule(30, "rest_short")],
        );

        let err = config.validate().expect_err("unsorted rules must fail");
        assert_eq!(
            err,
            ConfigError::UnsortedDurationRules {
                name: "nap".to_string(),
                previous: 90,
                next: 30,
            }
        );
    }

    #[test]
    fn recognized_keywords_cover_mapping_keys_and_values() {
        let mut config = ConverterConfig::default();
        config
            .text_mappings
            .insert("word".to_string(), "study_english".to_string());
        config
            .duration_rules
            .insert("nap".to_string(), vec![rule(30, "rest_short")]);

        let keywords = config.recognized_keywords();
        for expected in ["getup", "word", "study_english", "nap", "rest_short"] {
            assert!(keywords.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn config_deserializes_with_defaults_for_missing_fields() {
        let config: ConverterConfig = serde_json::from_str(
            r#"{"date_check_mode": "full", "generated_sleep_path": "sleep_overnight"}"#,
        )
        .expect("partial config should deserialize");

        assert_eq!(config.date_check_mode, DateCheckMode::Full);
        assert_eq!(config.sleep_path(), "sleep_overnight");
        assert_eq!(config.remark_prefix, "r ");
    }
}
