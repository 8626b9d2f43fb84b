//! Application configuration.
//!
//! Non-secret settings come from a TOML file (`config/default.toml` unless
//! `--config` says otherwise).  Every section and field has a default, so a
//! missing file or a partial one is fine.  Secrets are read from the
//! environment only.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use skycal_adapters::{CalendarConfig, LlmConfig, TelegramConfig, WeatherConfig};
use skycal_dialogue::DialogueConfig;

use crate::helpers::env_non_empty;

/// Everything loaded from the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dialogue: DialogueConfig,
    pub llm: LlmConfig,
    pub weather: WeatherConfig,
    pub calendar: CalendarConfig,
    pub telegram: TelegramConfig,
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    /// A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

/// Credentials and endpoints taken from the environment.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub telegram_token: Option<String>,
    pub llm_api_key: Option<String>,
    pub openweather_api_key: Option<String>,
    pub caldav_url: Option<String>,
    pub caldav_username: Option<String>,
    pub caldav_password: Option<String>,
}

impl Secrets {
    /// Read every secret.  `GEMINI_API_KEY` wins over `LLM_API_KEY`.
    pub fn from_env() -> Self {
        Self {
            telegram_token: env_non_empty("TELEGRAM_BOT_TOKEN"),
            llm_api_key: env_non_empty("GEMINI_API_KEY").or_else(|| env_non_empty("LLM_API_KEY")),
            openweather_api_key: env_non_empty("OPENWEATHER_API_KEY"),
            caldav_url: env_non_empty("CALDAV_URL"),
            caldav_username: env_non_empty("CALDAV_USERNAME"),
            caldav_password: env_non_empty("CALDAV_PASSWORD"),
        }
    }

    pub fn require_telegram_token(&self) -> Result<&str> {
        self.telegram_token.as_deref().ok_or_else(|| {
            anyhow::anyhow!("TELEGRAM_BOT_TOKEN is required. Create a bot at https://t.me/BotFather")
        })
    }

    pub fn require_llm_api_key(&self) -> Result<&str> {
        self.llm_api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY (or LLM_API_KEY) is required for intent extraction"))
    }

    pub fn require_openweather_api_key(&self) -> Result<&str> {
        self.openweather_api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("OPENWEATHER_API_KEY is required for weather lookups"))
    }

    pub fn require_caldav_url(&self) -> Result<&str> {
        self.caldav_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("CALDAV_URL is required to create calendar events"))
    }
}
