//! Intent extraction through an OpenAI-compatible chat completions API.
//!
//! The default endpoint is Gemini's OpenAI-compatible surface, but any
//! provider that speaks `POST {base_url}/chat/completions` with bearer auth
//! works.  The model is asked for a single JSON object which is validated
//! here, at the boundary, so the dialogue engine only ever sees well-formed
//! intents.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use skycal_dialogue::{DialogueError, Intent, IntentExtractor, IntentSource};

use crate::error::{AdapterError, Result};

const SERVICE: &str = "llm";

/// Connection settings for the extraction model.  The API key comes from
/// the environment, never from this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// HTTP-level timeout; the dialogue engine applies its own bound too.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".into(),
            model: "gemini-2.0-flash".into(),
            temperature: 0.1,
            max_tokens: 512,
            request_timeout_secs: 30,
        }
    }
}

/// [`IntentExtractor`] backed by a chat completions model.
pub struct LlmIntentExtractor {
    http: reqwest::Client,
    config: LlmConfig,
    api_key: String,
    default_location: String,
}

impl LlmIntentExtractor {
    pub fn new(
        config: LlmConfig,
        api_key: impl Into<String>,
        default_location: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(AdapterError::Config("LLM API key is empty".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AdapterError::request(SERVICE, e))?;

        Ok(Self {
            http,
            config,
            api_key,
            default_location: default_location.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, text: &str, now: NaiveDateTime) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = build_request_body(&self.config, &system_prompt(now, &self.default_location), text);

        debug!(url = %url, model = %self.config.model, "sending extraction request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::request(SERVICE, e))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| AdapterError::request(SERVICE, e))?;

        if !status.is_success() {
            return Err(AdapterError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: raw,
            });
        }

        let v: Value = serde_json::from_str(&raw)?;
        completion_text(&v)
    }
}

#[async_trait]
impl IntentExtractor for LlmIntentExtractor {
    async fn extract(&self, text: &str, now: NaiveDateTime) -> skycal_dialogue::Result<Intent> {
        let content = self
            .complete(text, now)
            .await
            .map_err(|e| DialogueError::ExtractionFailed {
                reason: e.to_string(),
            })?;

        let intent = parse_intent_json(&content).map_err(|e| DialogueError::ExtractionFailed {
            reason: e.to_string(),
        })?;

        info!(
            activity = %intent.activity,
            target_time = %intent.target_time,
            confidence = intent.confidence,
            "model returned intent"
        );
        Ok(intent)
    }
}

// ---------------------------------------------------------------------------
// Prompt and wire format
// ---------------------------------------------------------------------------

/// The instruction sent ahead of every user message.
pub fn system_prompt(now: NaiveDateTime, default_location: &str) -> String {
    format!(
        r#"You extract scheduling intent from chat messages.

Current date and time: {now}

Rules:
1. Greetings, small talk and general questions that do not ask to schedule anything:
   activity = "casual conversation", confidence = 0.0.
2. Questions about the weather that do not schedule anything ("what's the weather like"):
   activity = "weather query", is_weather_query = true, confidence 0.8 or higher.
3. Requests to do something at some date or time ("I want to go for a run tomorrow at 3pm",
   "schedule a meeting this Friday"): activity = a short name for the activity,
   confidence 0.8 or higher.
4. has_specific_time is true only when a time of day is given ("3pm", "at 2:30",
   "9 in the morning"). A bare date or vague period ("tomorrow", "this Saturday",
   "next week") means has_specific_time = false and the datetime is that date at 00:00.
5. Resolve relative dates against the current date. location is null unless the user
   names a place; "{default_location}" is assumed otherwise.
6. If you cannot tell what the user wants: activity = "unknown", confidence = 0.0.

Answer with exactly one JSON object and nothing else:
{{"activity": string, "datetime": "YYYY-MM-DDTHH:MM:SS", "location": string or null,
 "confidence": number, "is_weather_query": boolean, "has_specific_time": boolean}}"#,
        now = now.format("%Y-%m-%dT%H:%M:%S (%A)"),
    )
}

/// Chat completions request body.
pub fn build_request_body(config: &LlmConfig, system: &str, user: &str) -> Value {
    json!({
        "model": config.model,
        "temperature": config.temperature,
        "max_tokens": config.max_tokens,
        "messages": [
            { "role": "system", "content": system },
            { "role": "user", "content": user },
        ],
    })
}

/// Pull the assistant text out of a chat completions response.
pub fn completion_text(v: &Value) -> Result<String> {
    let message = &v["choices"][0]["message"];
    if message.is_null() {
        return Err(AdapterError::invalid(
            SERVICE,
            "missing `choices[0].message` in response",
        ));
    }
    message["content"]
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| AdapterError::invalid(SERVICE, "message has no text content"))
}

/// Model output as it appears on the wire, before validation.
#[derive(Debug, Deserialize)]
struct RawIntent {
    activity: String,
    datetime: String,
    #[serde(default)]
    location: Option<String>,
    confidence: f64,
    #[serde(default)]
    is_weather_query: bool,
    #[serde(default)]
    has_specific_time: bool,
}

/// Validate the model's JSON answer into an [`Intent`].
///
/// Markdown code fences around the object are tolerated.  Confidence is
/// clamped to `[0, 1]` and a blank location is treated as absent.
pub fn parse_intent_json(text: &str) -> Result<Intent> {
    let cleaned = text.trim();
    let cleaned = cleaned.strip_prefix("```json").unwrap_or(cleaned);
    let cleaned = cleaned.strip_prefix("```").unwrap_or(cleaned);
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned);
    let cleaned = cleaned.trim();

    let raw: RawIntent = serde_json::from_str(cleaned)?;

    let activity = raw.activity.trim();
    if activity.is_empty() {
        return Err(AdapterError::invalid(SERVICE, "empty activity"));
    }
    let target_time = parse_datetime(&raw.datetime).ok_or_else(|| {
        AdapterError::invalid(SERVICE, format!("unparseable datetime `{}`", raw.datetime))
    })?;
    if !raw.confidence.is_finite() {
        return Err(AdapterError::invalid(SERVICE, "confidence is not a number"));
    }

    Ok(Intent {
        activity: activity.to_owned(),
        target_time,
        location: raw
            .location
            .map(|l| l.trim().to_owned())
            .filter(|l| !l.is_empty()),
        confidence: raw.confidence.clamp(0.0, 1.0),
        is_weather_query: raw.is_weather_query,
        has_specific_time: raw.has_specific_time,
        source: IntentSource::Extracted,
    })
}

/// Accepts RFC 3339 (wall-clock time in the given offset), naive ISO
/// date-times with or without seconds, and bare dates (as midnight).
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
