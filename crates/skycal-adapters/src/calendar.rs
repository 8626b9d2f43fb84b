//! CalDAV calendar writer.
//!
//! Events are rendered as RFC 5545 iCalendar documents and stored with a
//! single `PUT {collection}/{uid}.ics`, which works against Nextcloud,
//! Radicale, iCloud and Google's CalDAV endpoint alike.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use skycal_dialogue::{CalendarEvent, CalendarWriter, DialogueError, Reminder, ReminderMethod};

use crate::error::{AdapterError, Result};

const SERVICE: &str = "caldav";

/// Settings for the CalDAV writer.  The collection URL and credentials come
/// from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// IANA zone attached to event times (`DTSTART;TZID=...`).
    pub timezone: String,
    /// Recipient for email reminders.  Without one, email reminders are
    /// delivered as display alarms.
    pub reminder_email: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Singapore".into(),
            reminder_email: None,
            request_timeout_secs: 15,
        }
    }
}

/// [`CalendarWriter`] that PUTs iCalendar events into a CalDAV collection.
pub struct CalDavWriter {
    http: reqwest::Client,
    collection: Url,
    username: Option<String>,
    password: Option<String>,
    config: CalendarConfig,
}

impl CalDavWriter {
    pub fn new(
        config: CalendarConfig,
        collection_url: &str,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let collection = Url::parse(collection_url)
            .map_err(|e| AdapterError::Config(format!("invalid CalDAV URL `{collection_url}`: {e}")))?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("skycal/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AdapterError::request(SERVICE, e))?;

        Ok(Self {
            http,
            collection,
            username,
            password,
            config,
        })
    }

    /// Where an event with `uid` is stored.
    pub fn event_url(&self, uid: &str) -> String {
        format!("{}/{uid}.ics", self.collection.as_str().trim_end_matches('/'))
    }

    async fn put_event(&self, event: &CalendarEvent) -> Result<bool> {
        let uid = Uuid::now_v7().to_string();
        let body = render_ical(
            event,
            &uid,
            &self.config.timezone,
            self.config.reminder_email.as_deref(),
            Utc::now().naive_utc(),
        );
        let url = self.event_url(&uid);

        debug!(url = %url, title = %event.title, "creating calendar event");

        let mut request = self
            .http
            .put(&url)
            .header("Content-Type", "text/calendar; charset=utf-8")
            .header("If-None-Match", "*")
            .body(body);
        if let Some(user) = &self.username {
            request = request.basic_auth(user, self.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::request(SERVICE, e))?;

        let status = response.status().as_u16();
        if is_created(status) {
            info!(uid = %uid, status, "calendar event stored");
            Ok(true)
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(uid = %uid, status, body = %body, "CalDAV server refused event");
            Ok(false)
        }
    }
}

#[async_trait]
impl CalendarWriter for CalDavWriter {
    async fn create_event(&self, event: &CalendarEvent) -> skycal_dialogue::Result<bool> {
        self.put_event(event)
            .await
            .map_err(|e| DialogueError::CalendarFailed {
                reason: e.to_string(),
            })
    }
}

/// CalDAV servers answer a successful PUT with one of these.
pub fn is_created(status: u16) -> bool {
    matches!(status, 200 | 201 | 204)
}

// ---------------------------------------------------------------------------
// iCalendar rendering (RFC 5545)
// ---------------------------------------------------------------------------

/// Render `event` as a VCALENDAR document with one VALARM per reminder.
pub fn render_ical(
    event: &CalendarEvent,
    uid: &str,
    timezone: &str,
    reminder_email: Option<&str>,
    stamp: NaiveDateTime,
) -> String {
    let mut ical = String::with_capacity(1024);
    ical.push_str("BEGIN:VCALENDAR\r\n");
    ical.push_str("VERSION:2.0\r\n");
    ical.push_str("PRODID:-//skycal//Scheduler//EN\r\n");
    ical.push_str("BEGIN:VEVENT\r\n");
    ical.push_str(&format!("UID:{uid}\r\n"));
    ical.push_str(&format!("DTSTAMP:{}Z\r\n", ical_datetime(stamp)));
    ical.push_str(&format!("DTSTART;TZID={timezone}:{}\r\n", ical_datetime(event.start)));
    ical.push_str(&format!("DTEND;TZID={timezone}:{}\r\n", ical_datetime(event.end)));
    ical.push_str(&format!("SUMMARY:{}\r\n", escape_text(&event.title)));
    ical.push_str(&format!("DESCRIPTION:{}\r\n", escape_text(&event.description)));
    ical.push_str(&format!("LOCATION:{}\r\n", escape_text(&event.location)));
    for reminder in &event.reminders {
        push_alarm(&mut ical, reminder, &event.title, reminder_email);
    }
    ical.push_str("END:VEVENT\r\n");
    ical.push_str("END:VCALENDAR\r\n");
    ical
}

fn push_alarm(ical: &mut String, reminder: &Reminder, title: &str, email: Option<&str>) {
    let title = escape_text(title);
    ical.push_str("BEGIN:VALARM\r\n");
    match (reminder.method, email) {
        (ReminderMethod::Email, Some(address)) => {
            ical.push_str("ACTION:EMAIL\r\n");
            ical.push_str(&format!("SUMMARY:Reminder: {title}\r\n"));
            ical.push_str(&format!("DESCRIPTION:{title}\r\n"));
            ical.push_str(&format!("ATTENDEE:mailto:{address}\r\n"));
        }
        _ => {
            ical.push_str("ACTION:DISPLAY\r\n");
            ical.push_str(&format!("DESCRIPTION:{title}\r\n"));
        }
    }
    ical.push_str(&format!("TRIGGER:-PT{}M\r\n", reminder.minutes_before));
    ical.push_str("END:VALARM\r\n");
}

/// `20250529T150000`
pub fn ical_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y%m%dT%H%M%S").to_string()
}

/// Escape TEXT values: backslash, semicolon, comma and newlines.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}
