//! Collaborator interfaces the dialogue engine depends on.
//!
//! Implementations live outside this crate (see `skycal-adapters`).  Every
//! method may fail; the workflow engine absorbs failures with fallback
//! values so a provider outage never stalls a turn.

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::intent::Intent;
use crate::weather::Weather;

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Turns raw chat text into a structured [`Intent`].
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    /// Extract an intent from `text`, resolving relative dates against `now`.
    async fn extract(&self, text: &str, now: NaiveDateTime) -> Result<Intent>;
}

/// Looks up the weather for a place and time.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn forecast(&self, target_time: NaiveDateTime, location: &str) -> Result<Weather>;
}

/// Persists calendar events.
#[async_trait]
pub trait CalendarWriter: Send + Sync {
    /// Create the event.  `Ok(false)` means the backend refused it.
    async fn create_event(&self, event: &CalendarEvent) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// Calendar event payload
// ---------------------------------------------------------------------------

/// How a reminder is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderMethod {
    Email,
    Popup,
}

/// A reminder fired `minutes_before` the event starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub method: ReminderMethod,
    pub minutes_before: u32,
}

/// Reminders attached to every scheduled event: one day and thirty minutes
/// ahead.
pub const DEFAULT_REMINDERS: [Reminder; 2] = [
    Reminder {
        method: ReminderMethod::Email,
        minutes_before: 24 * 60,
    },
    Reminder {
        method: ReminderMethod::Popup,
        minutes_before: 30,
    },
];

/// The event written to the calendar for a scheduled activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub location: String,
    pub description: String,
    pub reminders: Vec<Reminder>,
}

impl CalendarEvent {
    /// Default length of a scheduled activity, in minutes.
    pub const DEFAULT_DURATION_MINUTES: i64 = 60;

    /// Derive the event for `intent`, filling in `default_location`.
    pub fn from_intent(intent: &Intent, default_location: &str) -> Self {
        Self {
            title: intent.activity.clone(),
            start: intent.target_time,
            end: intent.target_time + TimeDelta::minutes(Self::DEFAULT_DURATION_MINUTES),
            location: intent.location_or(default_location).to_owned(),
            description: format!("Scheduled via skycal\nActivity: {}", intent.activity),
            reminders: DEFAULT_REMINDERS.to_vec(),
        }
    }
}
