//! Telegram Bot API client for the bot gateway.
//!
//! Only the three calls the gateway needs: `getMe` to verify the token,
//! `getUpdates` for long polling and `sendMessage` for replies.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{AdapterError, Result};

const SERVICE: &str = "telegram";

/// Telegram rejects messages longer than 4096 characters; leave headroom.
pub const MAX_MESSAGE_LEN: usize = 4000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
    /// Long-poll timeout passed to `getUpdates`, in seconds.
    pub poll_timeout_secs: u64,
    /// Pause after a failed poll before retrying, in seconds.
    pub retry_delay_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".into(),
            poll_timeout_secs: 30,
            retry_delay_secs: 5,
        }
    }
}

/// A text message pulled from `getUpdates`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub update_id: i64,
    pub chat_id: i64,
    /// Trimmed message text.
    pub text: String,
}

/// Thin client over the Bot API.
pub struct TelegramClient {
    http: reqwest::Client,
    api: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig, token: &str) -> Result<Self> {
        if token.is_empty() {
            return Err(AdapterError::Config("Telegram bot token is empty".into()));
        }
        // The HTTP timeout must outlast the long poll.
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.poll_timeout_secs + 15))
            .build()
            .map_err(|e| AdapterError::request(SERVICE, e))?;
        Ok(Self {
            http,
            api: format!("{}/bot{token}", config.api_base.trim_end_matches('/')),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.api)
    }

    async fn call(&self, method: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| AdapterError::request(SERVICE, e))?;
        let v: Value = response
            .json()
            .await
            .map_err(|e| AdapterError::invalid(SERVICE, format!("{method}: {e}")))?;
        parse_telegram_response(&v, method)?;
        Ok(v["result"].clone())
    }

    /// Verify the token; returns the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self.call("getMe", &json!({})).await?;
        Ok(me["username"].as_str().unwrap_or("unknown").to_owned())
    }

    /// Long-poll for updates at or after `offset`.
    ///
    /// Returns the next offset to poll from together with the text messages
    /// worth handing to the dialogue engine.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<(i64, Vec<IncomingMessage>)> {
        let result = self
            .call(
                "getUpdates",
                &json!({
                    "offset": offset,
                    "timeout": timeout_secs,
                    "allowed_updates": ["message"],
                }),
            )
            .await?;
        let updates = result.as_array().map(Vec::as_slice).unwrap_or_default();
        Ok(parse_updates(updates, offset))
    }

    /// Discard updates queued while the bot was offline.
    ///
    /// Asks for only the newest pending update (`offset = -1`), which makes
    /// Telegram forget everything older, and returns the offset just past
    /// it.  Returns 0 when nothing is queued.
    pub async fn skip_backlog(&self) -> Result<i64> {
        let result = self
            .call(
                "getUpdates",
                &json!({
                    "offset": -1,
                    "timeout": 0,
                    "allowed_updates": ["message"],
                }),
            )
            .await?;
        let updates = result.as_array().map(Vec::as_slice).unwrap_or_default();
        Ok(backlog_offset(updates))
    }

    /// Send `text` to `chat_id`, split into as many messages as needed.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            debug!(chat_id, len = chunk.len(), "sending Telegram message");
            self.call("sendMessage", &json!({ "chat_id": chat_id, "text": chunk }))
                .await?;
        }
        Ok(())
    }
}

/// Check the `ok` envelope every Bot API response carries.
pub fn parse_telegram_response(response: &Value, method: &str) -> Result<()> {
    if response["ok"].as_bool().unwrap_or(false) {
        return Ok(());
    }
    let error_code = response["error_code"].as_i64().unwrap_or(-1);
    let description = response["description"].as_str().unwrap_or("unknown error");
    Err(AdapterError::invalid(
        SERVICE,
        format!("{method} failed (code {error_code}): {description}"),
    ))
}

/// Extract text messages from a `getUpdates` result and compute the next
/// offset.  Non-text updates and messages shorter than two characters after
/// trimming still advance the offset but are not returned.
pub fn parse_updates(updates: &[Value], offset: i64) -> (i64, Vec<IncomingMessage>) {
    let mut next = offset;
    let mut messages = Vec::new();
    for update in updates {
        let Some(update_id) = update["update_id"].as_i64() else {
            continue;
        };
        next = next.max(update_id + 1);

        let message = &update["message"];
        let (Some(chat_id), Some(text)) = (message["chat"]["id"].as_i64(), message["text"].as_str())
        else {
            continue;
        };
        let text = text.trim();
        if text.chars().count() < 2 {
            continue;
        }
        messages.push(IncomingMessage {
            update_id,
            chat_id,
            text: text.to_owned(),
        });
    }
    (next, messages)
}

/// The offset to resume from after the newest update in `updates`, or 0
/// when there is none.
pub fn backlog_offset(updates: &[Value]) -> i64 {
    updates
        .iter()
        .filter_map(|u| u["update_id"].as_i64())
        .max()
        .map_or(0, |id| id + 1)
}

/// Split `text` into chunks of at most `max_len` bytes, preferring line and
/// then word boundaries.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_owned()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_owned());
            break;
        }

        let mut boundary = max_len;
        while boundary > 0 && !remaining.is_char_boundary(boundary) {
            boundary -= 1;
        }

        let head = &remaining[..boundary];
        let split_at = match head.rfind('\n').or_else(|| head.rfind(' ')) {
            Some(0) | None => boundary,
            Some(i) => i,
        };

        chunks.push(remaining[..split_at].to_owned());
        remaining = remaining[split_at..].trim_start();
    }
    chunks
}
