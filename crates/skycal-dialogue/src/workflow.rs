//! Workflow engine.
//!
//! A turn runs as a single pass over a small step graph:
//!
//! ```text
//! ExtractIntent ──┬─> Casual
//!                 ├─> WeatherQuery
//!                 ├─> TimeClarification
//!                 ├─> NeedsClarification
//!                 └─> CheckWeather ──┬─> CreateEvent
//!                                    └─> NeedsClarification
//! ```
//!
//! The graph has no cycles, so every run visits at most three steps.  The
//! engine never touches the clarification store: it reports what happened
//! through [`WorkflowOutcome`] and the caller decides what to persist.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::DialogueConfig;
use crate::context::{ConversationId, PendingClarification};
use crate::error::{DialogueError, Result};
use crate::format::intent_time;
use crate::intent::Intent;
use crate::replies;
use crate::routing::{
    ExtractionRoute, WeatherRoute, asks_generic_clarification, route_after_extraction,
    route_after_weather,
};
use crate::traits::{CalendarEvent, CalendarWriter, IntentExtractor, WeatherProvider};
use crate::weather::Weather;

// ---------------------------------------------------------------------------
// Steps and turn state
// ---------------------------------------------------------------------------

/// A node in the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ExtractIntent,
    Casual,
    WeatherQuery,
    TimeClarification,
    CheckWeather,
    CreateEvent,
    NeedsClarification,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExtractIntent => "extract_intent",
            Self::Casual => "casual",
            Self::WeatherQuery => "weather_query",
            Self::TimeClarification => "time_clarification",
            Self::CheckWeather => "check_weather",
            Self::CreateEvent => "create_event",
            Self::NeedsClarification => "needs_clarification",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Working state of one turn.  Created fresh per turn and discarded once
/// the reply is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnState {
    pub raw_message: String,
    pub conversation_id: ConversationId,
    pub intent: Option<Intent>,
    pub weather: Option<Weather>,
    pub calendar_event_created: bool,
    pub response_text: String,
    pub needs_clarification: bool,
}

impl TurnState {
    pub fn new(conversation_id: ConversationId, raw_message: impl Into<String>) -> Self {
        Self {
            raw_message: raw_message.into(),
            conversation_id,
            intent: None,
            weather: None,
            calendar_event_created: false,
            response_text: String::new(),
            needs_clarification: false,
        }
    }

    /// Seed the state with an already-known intent, for runs that skip
    /// extraction.
    #[must_use]
    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intent = Some(intent);
        self
    }
}

/// What a workflow run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowOutcome {
    pub state: TurnState,
    /// Steps visited, in order.  Never empty.
    pub path: Vec<Step>,
}

impl WorkflowOutcome {
    /// The step that produced the reply.
    pub fn terminal(&self) -> Step {
        self.path.last().copied().unwrap_or(Step::ExtractIntent)
    }

    /// Whether the run went through the weather check.
    pub fn checked_weather(&self) -> bool {
        self.path.contains(&Step::CheckWeather)
    }

    /// The clarification this run left open, if any.
    ///
    /// A time question is pending after `TimeClarification`.  A weather
    /// decision is pending only when clarification was reached from the
    /// weather check because the forecast is rainy; generic clarification
    /// never leaves anything behind.
    pub fn pending_clarification(&self, now: NaiveDateTime) -> Option<PendingClarification> {
        let intent = self.state.intent.as_ref()?;
        match self.terminal() {
            Step::TimeClarification => Some(PendingClarification::time(intent.clone(), now)),
            Step::NeedsClarification if self.checked_weather() => {
                let weather = self.state.weather.as_ref().filter(|w| w.is_rainy)?;
                Some(PendingClarification::weather(
                    intent.clone(),
                    weather.clone(),
                    now,
                ))
            }
            _ => None,
        }
    }
}

enum Transition {
    Next(Step),
    End,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Runs turns over the step graph against the three collaborators.
pub struct WorkflowEngine {
    extractor: Arc<dyn IntentExtractor>,
    weather: Arc<dyn WeatherProvider>,
    calendar: Arc<dyn CalendarWriter>,
    default_location: String,
    timeout: Duration,
}

impl WorkflowEngine {
    pub fn new(
        extractor: Arc<dyn IntentExtractor>,
        weather: Arc<dyn WeatherProvider>,
        calendar: Arc<dyn CalendarWriter>,
        config: &DialogueConfig,
    ) -> Self {
        Self {
            extractor,
            weather,
            calendar,
            default_location: config.default_location.clone(),
            timeout: config.collaborator_timeout(),
        }
    }

    /// Run a full turn starting from extraction.
    pub async fn run(&self, state: TurnState, now: NaiveDateTime) -> WorkflowOutcome {
        self.run_from(Step::ExtractIntent, state, now).await
    }

    /// Run a turn starting at `entry`.  Used by clarification resolution to
    /// re-enter at the weather check with a corrected intent.
    pub async fn run_from(
        &self,
        entry: Step,
        mut state: TurnState,
        now: NaiveDateTime,
    ) -> WorkflowOutcome {
        let mut path = Vec::with_capacity(3);
        let mut step = entry;
        loop {
            path.push(step);
            tracing::debug!(conversation_id = %state.conversation_id, step = %step, "workflow step");
            match self.execute(step, &mut state, now).await {
                Transition::Next(next) => step = next,
                Transition::End => break,
            }
        }

        tracing::info!(
            conversation_id = %state.conversation_id,
            terminal = %step,
            steps = path.len(),
            needs_clarification = state.needs_clarification,
            "workflow finished"
        );
        WorkflowOutcome { state, path }
    }

    async fn execute(&self, step: Step, state: &mut TurnState, now: NaiveDateTime) -> Transition {
        match step {
            Step::ExtractIntent => {
                let intent = self.extract_intent(&state.raw_message, now).await;
                state.intent = Some(intent);
                Transition::Next(match route_after_extraction(state.intent.as_ref()) {
                    ExtractionRoute::Casual => Step::Casual,
                    ExtractionRoute::WeatherQuery => Step::WeatherQuery,
                    ExtractionRoute::TimeClarification => Step::TimeClarification,
                    ExtractionRoute::CheckWeather => Step::CheckWeather,
                    ExtractionRoute::NeedsClarification => Step::NeedsClarification,
                })
            }

            Step::Casual => {
                state.response_text = replies::casual(&state.raw_message).to_owned();
                state.needs_clarification = false;
                Transition::End
            }

            Step::WeatherQuery => {
                match state.intent.clone() {
                    Some(intent) => {
                        let location = intent.location_or(&self.default_location).to_owned();
                        let weather = self.check_weather(intent.target_time, &location).await;
                        state.response_text = replies::weather_report(&location, &weather);
                        state.weather = Some(weather);
                    }
                    None => {
                        state.response_text = replies::weather_query_unclear().to_owned();
                    }
                }
                state.needs_clarification = false;
                Transition::End
            }

            Step::TimeClarification => {
                if let Some(intent) = &state.intent {
                    state.response_text =
                        replies::time_question(&intent.activity, &intent_time(intent));
                } else {
                    state.response_text = replies::unclear_request().to_owned();
                }
                state.needs_clarification = true;
                Transition::End
            }

            Step::CheckWeather => {
                if let Some(intent) = &state.intent {
                    let location = intent.location_or(&self.default_location).to_owned();
                    let weather = self.check_weather(intent.target_time, &location).await;
                    state.weather = Some(weather);
                }
                Transition::Next(match route_after_weather(state.weather.as_ref()) {
                    WeatherRoute::CreateEvent => Step::CreateEvent,
                    WeatherRoute::NeedsClarification => Step::NeedsClarification,
                })
            }

            Step::CreateEvent => {
                let created = match &state.intent {
                    Some(intent) => self.create_event(intent).await,
                    None => false,
                };
                state.calendar_event_created = created;
                state.response_text = match (&state.intent, created) {
                    (Some(intent), true) => replies::scheduled(&intent.activity, &intent_time(intent)),
                    _ => replies::calendar_failed().to_owned(),
                };
                state.needs_clarification = false;
                Transition::End
            }

            Step::NeedsClarification => {
                state.response_text = match &state.intent {
                    Some(intent) if !asks_generic_clarification(Some(intent)) => {
                        let description = state
                            .weather
                            .as_ref()
                            .map_or("rainy", |w| w.description.as_str());
                        replies::rainy_weather(description, &intent.activity, &intent_time(intent))
                    }
                    _ => replies::unclear_request().to_owned(),
                };
                state.needs_clarification = true;
                Transition::End
            }
        }
    }

    // -- Collaborator calls --------------------------------------------------

    /// Extract an intent, substituting [`Intent::unknown`] on failure or
    /// timeout.
    pub async fn extract_intent(&self, text: &str, now: NaiveDateTime) -> Intent {
        match self.bounded("intent extractor", self.extractor.extract(text, now)).await {
            Ok(intent) => {
                tracing::info!(
                    activity = %intent.activity,
                    confidence = intent.confidence,
                    is_weather_query = intent.is_weather_query,
                    has_specific_time = intent.has_specific_time,
                    date_only = intent.is_date_only(),
                    "intent extracted"
                );
                intent
            }
            Err(e) => {
                tracing::warn!(error = %e, "intent extraction failed, using fallback intent");
                Intent::unknown(now)
            }
        }
    }

    /// Look up the weather, substituting [`Weather::fallback`] on failure or
    /// timeout.
    pub async fn check_weather(&self, target_time: NaiveDateTime, location: &str) -> Weather {
        match self
            .bounded("weather provider", self.weather.forecast(target_time, location))
            .await
        {
            Ok(weather) => {
                tracing::info!(
                    location,
                    description = %weather.description,
                    is_rainy = weather.is_rainy,
                    "weather checked"
                );
                weather
            }
            Err(e) => {
                tracing::warn!(location, error = %e, "weather lookup failed, assuming fair weather");
                Weather::fallback()
            }
        }
    }

    /// Write the calendar event for `intent`.  Refusal, error and timeout
    /// all count as failure.
    pub async fn create_event(&self, intent: &Intent) -> bool {
        let event = CalendarEvent::from_intent(intent, &self.default_location);
        match self
            .bounded("calendar writer", self.calendar.create_event(&event))
            .await
        {
            Ok(true) => {
                tracing::info!(title = %event.title, start = %event.start, "calendar event created");
                true
            }
            Ok(false) => {
                tracing::warn!(title = %event.title, "calendar refused event");
                false
            }
            Err(e) => {
                tracing::error!(title = %event.title, error = %e, "calendar write failed");
                false
            }
        }
    }

    async fn bounded<T>(
        &self,
        collaborator: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DialogueError::Timeout {
                collaborator,
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
