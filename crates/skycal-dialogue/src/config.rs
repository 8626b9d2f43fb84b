//! Dialogue engine configuration.
//!
//! Loaded from the `[dialogue]` section of `config/default.toml`.  Every
//! field has a default so a missing section is not an error.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::weather::RainPolicy;

/// Location used when the user does not name one.
pub const DEFAULT_LOCATION: &str = "Singapore";

/// Tunables for the dialogue engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Location substituted when an intent carries none.
    pub default_location: String,
    /// Seconds a pending clarification stays answerable.
    pub pending_ttl_secs: u64,
    /// Upper bound on any single collaborator call.
    pub collaborator_timeout_secs: u64,
    /// Lower-cased description fragments that mark a forecast as rainy.
    pub rain_keywords: Vec<String>,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            default_location: DEFAULT_LOCATION.to_owned(),
            pending_ttl_secs: 600,
            collaborator_timeout_secs: 20,
            rain_keywords: RainPolicy::default().keywords().to_vec(),
        }
    }
}

impl DialogueConfig {
    /// How long a pending clarification survives.
    pub fn pending_ttl(&self) -> chrono::TimeDelta {
        i64::try_from(self.pending_ttl_secs)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .unwrap_or(chrono::TimeDelta::MAX)
    }

    /// Time limit applied to each collaborator call.
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }

    /// The rain classification policy described by `rain_keywords`.
    pub fn rain_policy(&self) -> RainPolicy {
        RainPolicy::new(self.rain_keywords.clone())
    }
}
