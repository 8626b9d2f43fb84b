//! OpenWeatherMap weather provider.
//!
//! Targets within the forecast horizon are answered from the 3-hourly
//! `/forecast` endpoint, picking the entry closest to the target time.
//! Anything further out, or an empty forecast list, falls back to
//! `/weather` (current conditions).  All values are metric.

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use skycal_dialogue::{DialogueError, RainPolicy, Weather, WeatherProvider};

use crate::error::{AdapterError, Result};

const SERVICE: &str = "openweathermap";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
    /// Targets at most this many days ahead use the forecast endpoint.
    pub forecast_horizon_days: i64,
    pub request_timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org/data/2.5".into(),
            forecast_horizon_days: 5,
            request_timeout_secs: 15,
        }
    }
}

/// [`WeatherProvider`] backed by the OpenWeatherMap 2.5 API.
pub struct OpenWeatherProvider {
    http: reqwest::Client,
    config: WeatherConfig,
    api_key: String,
    rain_policy: RainPolicy,
}

impl OpenWeatherProvider {
    pub fn new(config: WeatherConfig, api_key: impl Into<String>, rain_policy: RainPolicy) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(AdapterError::Config("OpenWeatherMap API key is empty".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AdapterError::request(SERVICE, e))?;
        Ok(Self {
            http,
            config,
            api_key,
            rain_policy,
        })
    }

    async fn get(&self, endpoint: &str, location: &str) -> Result<Value> {
        let url = format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'));
        debug!(url = %url, location, "querying OpenWeatherMap");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| AdapterError::request(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AdapterError::invalid(SERVICE, e.to_string()))
    }

    async fn lookup(&self, target_time: NaiveDateTime, location: &str) -> Result<Weather> {
        let now = Local::now().naive_local();
        if within_horizon(target_time, now, self.config.forecast_horizon_days) {
            let forecast = self.get("forecast", location).await?;
            let entries = forecast["list"].as_array().map(Vec::as_slice).unwrap_or_default();
            if let Some(entry) = closest_entry(entries, local_timestamp(target_time)) {
                return parse_observation(entry, &self.rain_policy);
            }
            debug!(location, "forecast list empty, using current conditions");
        }

        let current = self.get("weather", location).await?;
        parse_observation(&current, &self.rain_policy)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn forecast(
        &self,
        target_time: NaiveDateTime,
        location: &str,
    ) -> skycal_dialogue::Result<Weather> {
        self.lookup(target_time, location)
            .await
            .map_err(|e| DialogueError::WeatherUnavailable {
                location: location.to_owned(),
                reason: e.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

/// Whether `target` is close enough to `now` for the forecast endpoint.
/// Past targets count as within the horizon.
pub fn within_horizon(target: NaiveDateTime, now: NaiveDateTime, horizon_days: i64) -> bool {
    (target - now).num_days() <= horizon_days
}

/// Unix timestamp of a local wall-clock time.  Nonexistent local times (DST
/// gaps) are read as UTC.
fn local_timestamp(t: NaiveDateTime) -> i64 {
    Local
        .from_local_datetime(&t)
        .earliest()
        .map_or_else(|| t.and_utc().timestamp(), |dt| dt.timestamp())
}

/// The forecast entry whose `dt` is nearest to `target_ts`.
pub fn closest_entry(entries: &[Value], target_ts: i64) -> Option<&Value> {
    entries
        .iter()
        .filter_map(|e| e["dt"].as_i64().map(|dt| (e, (dt - target_ts).abs())))
        .min_by_key(|(_, distance)| *distance)
        .map(|(e, _)| e)
}

/// Read temperature, description, humidity and feels-like out of a current
/// conditions body or a forecast entry; both share the same layout.
pub fn parse_observation(v: &Value, policy: &RainPolicy) -> Result<Weather> {
    let main = &v["main"];
    let temperature = main["temp"]
        .as_f64()
        .ok_or_else(|| AdapterError::invalid(SERVICE, "missing `main.temp`"))?;
    let description = v["weather"][0]["description"]
        .as_str()
        .ok_or_else(|| AdapterError::invalid(SERVICE, "missing `weather[0].description`"))?;
    let humidity = main["humidity"]
        .as_u64()
        .map_or(0, |h| u8::try_from(h.min(100)).unwrap_or(100));
    let feels_like = main["feels_like"].as_f64();

    Ok(Weather::observed(
        temperature,
        description,
        humidity,
        feels_like,
        policy,
    ))
}
