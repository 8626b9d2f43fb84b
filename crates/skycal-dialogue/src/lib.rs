//! Dialogue orchestration engine for skycal.
//!
//! Turns a free-text chat message into one of a small set of outcomes:
//! schedule a weather-checked calendar event, answer a weather question, ask
//! a clarifying question, or respond conversationally.
//!
//! ## Modules
//!
//! - [`intent`] -- Structured scheduling intent produced by the extractor.
//! - [`weather`] -- Weather observation and the rain classification policy.
//! - [`context`] -- Per-conversation pending clarifications with expiry.
//! - [`routing`] -- Pure routing decisions between workflow steps.
//! - [`workflow`] -- The single-pass step graph that produces a reply.
//! - [`resolver`] -- Resolution of short follow-up replies against a pending
//!   clarification.
//! - [`replies`] -- Every user-facing reply text.
//! - [`service`] -- The per-message entry point used by transports.
//! - [`traits`] -- Collaborator interfaces (extraction, weather, calendar).

pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod intent;
pub mod keywords;
pub mod replies;
pub mod resolver;
pub mod routing;
pub mod service;
pub mod traits;
pub mod weather;
pub mod workflow;

pub use config::DialogueConfig;
pub use context::{ClarificationKind, ClarificationStore, ConversationId, PendingClarification};
pub use error::{DialogueError, Result};
pub use intent::{Intent, IntentSource};
pub use resolver::{ClarificationResolver, ContextUpdate, Resolution};
pub use routing::{ExtractionRoute, WeatherRoute, route_after_extraction, route_after_weather};
pub use service::{DialogueService, Reply};
pub use traits::{CalendarEvent, CalendarWriter, IntentExtractor, Reminder, ReminderMethod, WeatherProvider};
pub use weather::{RainPolicy, Weather, WeatherSource};
pub use workflow::{Step, TurnState, WorkflowEngine, WorkflowOutcome};
