//! Routing rules between workflow steps.
//!
//! Pure, total functions: every input maps to a defined next step and none
//! of them touch collaborators or the context store.

use serde::{Deserialize, Serialize};

use crate::intent::Intent;
use crate::weather::Weather;

/// Casual conversation is recognized only at or below this confidence.
pub const CASUAL_MAX_CONFIDENCE: f64 = 0.1;

/// Scheduling and weather queries require strictly more than this.
pub const ACTIONABLE_MIN_CONFIDENCE: f64 = 0.5;

/// Where a turn goes after intent extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionRoute {
    Casual,
    WeatherQuery,
    TimeClarification,
    CheckWeather,
    NeedsClarification,
}

/// Where a turn goes after the weather check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherRoute {
    CreateEvent,
    NeedsClarification,
}

/// Whether `intent` is confident enough and concrete enough to act on.
pub fn is_actionable(intent: &Intent) -> bool {
    intent.confidence > ACTIONABLE_MIN_CONFIDENCE && !intent.is_unknown() && !intent.is_casual()
}

/// Decide the step after extraction.
pub fn route_after_extraction(intent: Option<&Intent>) -> ExtractionRoute {
    let Some(intent) = intent else {
        return ExtractionRoute::NeedsClarification;
    };

    if intent.is_casual() && intent.confidence <= CASUAL_MAX_CONFIDENCE {
        return ExtractionRoute::Casual;
    }

    if is_actionable(intent) {
        return if intent.is_weather_query {
            ExtractionRoute::WeatherQuery
        } else if !intent.has_specific_time {
            ExtractionRoute::TimeClarification
        } else {
            ExtractionRoute::CheckWeather
        };
    }

    ExtractionRoute::NeedsClarification
}

/// Whether the clarification step asks a generic "what do you mean"
/// question instead of offering the rainy-weather choices.
///
/// Generic for a missing intent, confidence at or below 0.5, or an unknown
/// activity.  Casual conversation is generic too at any confidence: it
/// never reaches the weather check, so there is no forecast to choose about.
pub fn asks_generic_clarification(intent: Option<&Intent>) -> bool {
    !intent.is_some_and(is_actionable)
}

/// Decide the step after the weather check.  Missing weather blocks
/// scheduling just like rain does.
pub fn route_after_weather(weather: Option<&Weather>) -> WeatherRoute {
    match weather {
        Some(w) if !w.is_rainy => WeatherRoute::CreateEvent,
        _ => WeatherRoute::NeedsClarification,
    }
}
