//! Shared helpers for the CLI subcommands.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use skycal_adapters::{CalDavWriter, LlmIntentExtractor, OpenWeatherProvider};
use skycal_dialogue::DialogueService;

use crate::config::{AppConfig, Secrets};

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Install the global subscriber.  `RUST_LOG` overrides `default_level`;
/// `SKYCAL_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if env_non_empty("SKYCAL_LOG_FORMAT").as_deref() == Some("json") {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Read an env var, treating empty values as unset.
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Service wiring
// ---------------------------------------------------------------------------

/// Build the dialogue service with the live collaborators.
pub fn build_service(config: &AppConfig, secrets: &Secrets) -> Result<DialogueService> {
    let extractor = LlmIntentExtractor::new(
        config.llm.clone(),
        secrets.require_llm_api_key()?,
        config.dialogue.default_location.clone(),
    )
    .context("failed to create intent extractor")?;
    info!(model = %extractor.model(), "intent extractor ready");

    let weather = OpenWeatherProvider::new(
        config.weather.clone(),
        secrets.require_openweather_api_key()?,
        config.dialogue.rain_policy(),
    )
    .context("failed to create weather provider")?;

    let calendar = CalDavWriter::new(
        config.calendar.clone(),
        secrets.require_caldav_url()?,
        secrets.caldav_username.clone(),
        secrets.caldav_password.clone(),
    )
    .context("failed to create CalDAV writer")?;

    info!(
        default_location = %config.dialogue.default_location,
        pending_ttl_secs = config.dialogue.pending_ttl_secs,
        collaborator_timeout_secs = config.dialogue.collaborator_timeout_secs,
        "dialogue service ready"
    );

    Ok(DialogueService::from_config(
        Arc::new(extractor),
        Arc::new(weather),
        Arc::new(calendar),
        &config.dialogue,
    ))
}
