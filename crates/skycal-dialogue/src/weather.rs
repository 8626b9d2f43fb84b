//! Weather observation and rain classification.
//!
//! `is_rainy` is a policy decision, not a provider field: it is computed by
//! [`RainPolicy`] from the lower-cased description.

use serde::{Deserialize, Serialize};

/// Where a weather observation came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherSource {
    /// Returned by the weather provider.
    #[default]
    Provider,
    /// Assumed because the provider failed or timed out.
    Fallback,
}

/// A single weather observation or forecast entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    pub description: String,
    pub is_rainy: bool,
    pub humidity_pct: u8,
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub source: WeatherSource,
}

impl Weather {
    /// Build an observation, classifying rain with `policy`.
    pub fn observed(
        temperature: f64,
        description: impl Into<String>,
        humidity_pct: u8,
        feels_like: Option<f64>,
        policy: &RainPolicy,
    ) -> Self {
        let description = description.into();
        Self {
            is_rainy: policy.is_rainy(&description),
            temperature,
            description,
            humidity_pct,
            feels_like,
            source: WeatherSource::Provider,
        }
    }

    /// The fixed non-rainy observation assumed during a provider outage.
    pub fn fallback() -> Self {
        Self {
            temperature: 25.0,
            description: "clear sky".to_owned(),
            is_rainy: false,
            humidity_pct: 70,
            feels_like: Some(27.0),
            source: WeatherSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == WeatherSource::Fallback
    }
}

/// Substring vocabulary that marks a description as rainy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RainPolicy {
    keywords: Vec<String>,
}

impl RainPolicy {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_rainy(&self, description: &str) -> bool {
        let lower = description.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

impl Default for RainPolicy {
    fn default() -> Self {
        Self::new(vec!["rain".into(), "drizzle".into(), "shower".into()])
    }
}
