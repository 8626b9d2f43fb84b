//! Structured scheduling intent.
//!
//! An [`Intent`] is produced by the extraction collaborator and is treated as
//! immutable; clarification resolution builds a corrected copy rather than
//! editing the original.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Activity label the extractor assigns to greetings and small talk.
pub const CASUAL_ACTIVITY: &str = "casual conversation";

/// Activity label for text the extractor could not interpret.
pub const UNKNOWN_ACTIVITY: &str = "unknown";

/// Where an intent came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    /// Returned by the extraction collaborator.
    #[default]
    Extracted,
    /// Synthesized because extraction failed or timed out.
    Fallback,
}

/// What the user asked for, as understood by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// The activity to schedule (e.g. "run"), or one of the reserved labels.
    pub activity: String,
    /// Concrete wall-clock target.  Date-only references resolve to midnight.
    pub target_time: NaiveDateTime,
    /// Location if the user named one.
    pub location: Option<String>,
    /// Extractor confidence in `[0, 1]`.
    pub confidence: f64,
    /// The user only asked about the weather.
    pub is_weather_query: bool,
    /// The user gave a time of day, not just a date.
    pub has_specific_time: bool,
    #[serde(default)]
    pub source: IntentSource,
}

impl Intent {
    /// The zero-confidence intent substituted when extraction fails.
    pub fn unknown(now: NaiveDateTime) -> Self {
        Self {
            activity: UNKNOWN_ACTIVITY.to_owned(),
            target_time: now,
            location: None,
            confidence: 0.0,
            is_weather_query: false,
            has_specific_time: false,
            source: IntentSource::Fallback,
        }
    }

    /// The named location, or `default` when none was given.
    pub fn location_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.location.as_deref().unwrap_or(default)
    }

    pub fn is_casual(&self) -> bool {
        self.activity == CASUAL_ACTIVITY
    }

    pub fn is_unknown(&self) -> bool {
        self.activity == UNKNOWN_ACTIVITY
    }

    /// Whether the target carries only a date (stored as midnight).
    pub fn is_date_only(&self) -> bool {
        crate::format::is_midnight(self.target_time)
    }

    /// A copy of this intent retargeted to `target_time`.
    pub fn retimed(&self, target_time: NaiveDateTime) -> Self {
        Self {
            target_time,
            ..self.clone()
        }
    }
}
