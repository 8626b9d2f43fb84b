//! Concrete collaborators for the skycal dialogue engine.
//!
//! Each module implements one of the `skycal-dialogue` collaborator traits
//! against a real service, plus the Telegram transport client used by the
//! bot gateway.
//!
//! ## Modules
//!
//! - [`llm_extractor`] -- Intent extraction through an OpenAI-compatible chat
//!   completions endpoint.
//! - [`openweather`] -- OpenWeatherMap forecasts and current conditions.
//! - [`calendar`] -- CalDAV event creation (RFC 5545 iCalendar over HTTP PUT).
//! - [`telegram`] -- Telegram Bot API long-polling and message delivery.

pub mod calendar;
pub mod error;
pub mod llm_extractor;
pub mod openweather;
pub mod telegram;

pub use calendar::{CalDavWriter, CalendarConfig};
pub use error::{AdapterError, Result};
pub use llm_extractor::{LlmConfig, LlmIntentExtractor};
pub use openweather::{OpenWeatherProvider, WeatherConfig};
pub use telegram::{IncomingMessage, TelegramClient, TelegramConfig};
