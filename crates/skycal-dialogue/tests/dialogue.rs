//! End-to-end turns through `DialogueService` with scripted collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use skycal_dialogue::{
    CalendarEvent, CalendarWriter, ClarificationKind, ConversationId, DialogueConfig,
    DialogueError, DialogueService, Intent, IntentExtractor, IntentSource, RainPolicy, Result,
    Weather, WeatherProvider,
};

// ---------------------------------------------------------------------------
// Scripted collaborators
// ---------------------------------------------------------------------------

type Script = Box<dyn Fn(&str) -> Option<Intent> + Send + Sync>;

struct ScriptedExtractor {
    script: Script,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl IntentExtractor for ScriptedExtractor {
    async fn extract(&self, text: &str, _now: NaiveDateTime) -> Result<Intent> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(text.to_owned());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        (self.script)(text).ok_or_else(|| DialogueError::ExtractionFailed {
            reason: "scripted failure".into(),
        })
    }
}

struct ScriptedWeather {
    description: Option<&'static str>,
    temperature: f64,
    calls: AtomicUsize,
}

#[async_trait]
impl WeatherProvider for ScriptedWeather {
    async fn forecast(&self, _target_time: NaiveDateTime, location: &str) -> Result<Weather> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.description {
            Some(description) => Ok(Weather::observed(
                self.temperature,
                description,
                65,
                Some(self.temperature + 2.0),
                &RainPolicy::default(),
            )),
            None => Err(DialogueError::WeatherUnavailable {
                location: location.into(),
                reason: "scripted outage".into(),
            }),
        }
    }
}

#[derive(Clone, Copy)]
enum CalendarBehavior {
    Accept,
    Refuse,
    Fail,
}

struct ScriptedCalendar {
    behavior: CalendarBehavior,
    events: Mutex<Vec<CalendarEvent>>,
}

#[async_trait]
impl CalendarWriter for ScriptedCalendar {
    async fn create_event(&self, event: &CalendarEvent) -> Result<bool> {
        self.events.lock().unwrap().push(event.clone());
        match self.behavior {
            CalendarBehavior::Accept => Ok(true),
            CalendarBehavior::Refuse => Ok(false),
            CalendarBehavior::Fail => Err(DialogueError::CalendarFailed {
                reason: "scripted failure".into(),
            }),
        }
    }
}

struct Harness {
    service: DialogueService,
    extractor: Arc<ScriptedExtractor>,
    weather: Arc<ScriptedWeather>,
    calendar: Arc<ScriptedCalendar>,
}

impl Harness {
    fn extraction_calls(&self) -> usize {
        self.extractor.calls.load(Ordering::SeqCst)
    }

    fn weather_calls(&self) -> usize {
        self.weather.calls.load(Ordering::SeqCst)
    }

    fn calendar_events(&self) -> Vec<CalendarEvent> {
        self.calendar.events.lock().unwrap().clone()
    }

    fn last_extraction_text(&self) -> Option<String> {
        self.extractor.seen.lock().unwrap().last().cloned()
    }
}

struct HarnessBuilder {
    script: Script,
    description: Option<&'static str>,
    temperature: f64,
    calendar: CalendarBehavior,
    delay: Duration,
}

impl HarnessBuilder {
    fn new(script: impl Fn(&str) -> Option<Intent> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            description: Some("clear sky"),
            temperature: 26.0,
            calendar: CalendarBehavior::Accept,
            delay: Duration::ZERO,
        }
    }

    fn weather(mut self, description: Option<&'static str>) -> Self {
        self.description = description;
        self
    }

    fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    fn calendar(mut self, behavior: CalendarBehavior) -> Self {
        self.calendar = behavior;
        self
    }

    fn extraction_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn build(self) -> Harness {
        let extractor = Arc::new(ScriptedExtractor {
            script: self.script,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay: self.delay,
        });
        let weather = Arc::new(ScriptedWeather {
            description: self.description,
            temperature: self.temperature,
            calls: AtomicUsize::new(0),
        });
        let calendar = Arc::new(ScriptedCalendar {
            behavior: self.calendar,
            events: Mutex::new(Vec::new()),
        });
        let service = DialogueService::from_config(
            extractor.clone(),
            weather.clone(),
            calendar.clone(),
            &DialogueConfig::default(),
        );
        Harness {
            service,
            extractor,
            weather,
            calendar,
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const CHAT: ConversationId = ConversationId(1001);

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 5, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// Wednesday 28 May 2025, 10:00.
fn now() -> NaiveDateTime {
    at(28, 10, 0)
}

fn scheduling(activity: &str, target_time: NaiveDateTime, confidence: f64) -> Intent {
    Intent {
        activity: activity.into(),
        target_time,
        location: None,
        confidence,
        is_weather_query: false,
        has_specific_time: true,
        source: IntentSource::Extracted,
    }
}

fn date_only(activity: &str, day: u32) -> Intent {
    Intent {
        has_specific_time: false,
        ..scheduling(activity, at(day, 0, 0), 0.85)
    }
}

fn casual() -> Intent {
    Intent {
        activity: "casual conversation".into(),
        target_time: now(),
        location: None,
        confidence: 0.1,
        is_weather_query: false,
        has_specific_time: false,
        source: IntentSource::Extracted,
    }
}

fn run_tomorrow_at_3pm(_: &str) -> Option<Intent> {
    Some(scheduling("run", at(29, 15, 0), 0.9))
}

// ---------------------------------------------------------------------------
// Fresh turns
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dry_forecast_schedules_run() {
    let h = HarnessBuilder::new(run_tomorrow_at_3pm).build();

    let reply = h
        .service
        .handle_message_at(CHAT, "I want to go for a run tomorrow at 3pm", now())
        .await;

    assert_eq!(
        reply.text,
        "Great! I've scheduled 'run' for 29 May 2025, 3:00 PM. The weather looks good!"
    );
    assert!(!reply.needs_clarification);

    let events = h.calendar_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "run");
    assert_eq!(events[0].start, at(29, 15, 0));
    assert_eq!(events[0].end, at(29, 16, 0));
    assert_eq!(events[0].location, "Singapore");
    assert!(h.service.store().is_empty());
}

#[tokio::test]
async fn greeting_only_calls_extractor() {
    let h = HarnessBuilder::new(|_| Some(casual())).build();

    let reply = h.service.handle_message_at(CHAT, "hello", now()).await;

    assert!(reply.text.starts_with("Hello! I'm your scheduling assistant."));
    assert!(!reply.needs_clarification);
    assert_eq!(h.extraction_calls(), 1);
    assert_eq!(h.weather_calls(), 0);
    assert!(h.calendar_events().is_empty());
}

#[tokio::test]
async fn weather_query_reports_and_never_schedules() {
    let h = HarnessBuilder::new(|_| {
        Some(Intent {
            activity: "weather query".into(),
            is_weather_query: true,
            has_specific_time: false,
            ..scheduling("weather query", at(28, 0, 0), 0.9)
        })
    })
    .temperature(31.5)
    .build();

    let reply = h
        .service
        .handle_message_at(CHAT, "what's the weather like?", now())
        .await;

    assert!(reply.text.starts_with("Weather for Singapore"));
    assert!(reply.text.contains("Temperature: 31.5°C"));
    assert!(reply.text.contains("Conditions: Clear Sky"));
    assert!(reply.text.contains("Humidity: 65%"));
    assert_eq!(
        reply.text.lines().filter(|l| l.starts_with("Advice:")).count(),
        1
    );
    assert!(reply.text.contains("stay hydrated"));
    assert!(!reply.needs_clarification);
    assert!(h.calendar_events().is_empty());
    assert!(h.service.store().is_empty());
}

#[tokio::test]
async fn low_confidence_or_unknown_always_asks_to_clarify() {
    for confidence in [0.0, 0.25, 0.5] {
        let h = HarnessBuilder::new(move |_| Some(scheduling("run", at(29, 15, 0), confidence)))
            .build();
        let reply = h.service.handle_message_at(CHAT, "run maybe", now()).await;
        assert!(reply.needs_clarification, "confidence {confidence}");
        assert!(reply.text.starts_with("I'm not sure I understood"));
        assert!(h.calendar_events().is_empty());
        assert!(h.service.store().is_empty());
    }

    let h = HarnessBuilder::new(|_| Some(scheduling("unknown", at(29, 15, 0), 0.95))).build();
    let reply = h.service.handle_message_at(CHAT, "blorp", now()).await;
    assert!(reply.needs_clarification);
    assert!(h.service.store().is_empty());
}

#[tokio::test]
async fn extractor_outage_asks_to_clarify() {
    let h = HarnessBuilder::new(|_| None).build();

    let reply = h.service.handle_message_at(CHAT, "run at 3", now()).await;

    assert!(reply.needs_clarification);
    assert!(reply.text.starts_with("I'm not sure I understood"));
    assert_eq!(h.weather_calls(), 0);
    assert!(h.service.store().is_empty());
}

#[tokio::test]
async fn weather_outage_assumes_fair_weather() {
    let h = HarnessBuilder::new(run_tomorrow_at_3pm).weather(None).build();

    let reply = h.service.handle_message_at(CHAT, "run tomorrow 3pm", now()).await;

    assert!(reply.text.starts_with("Great! I've scheduled 'run'"));
    assert_eq!(h.calendar_events().len(), 1);
}

#[tokio::test]
async fn calendar_refusal_and_error_both_report_failure() {
    for behavior in [CalendarBehavior::Refuse, CalendarBehavior::Fail] {
        let h = HarnessBuilder::new(run_tomorrow_at_3pm)
            .calendar(behavior)
            .build();
        let reply = h.service.handle_message_at(CHAT, "run tomorrow 3pm", now()).await;
        assert_eq!(
            reply.text,
            "Sorry, I couldn't create the calendar event. Please try again."
        );
        assert!(!reply.needs_clarification);
    }
}

// ---------------------------------------------------------------------------
// Time clarification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn time_reply_keeps_original_date() {
    // The extractor resets the date to tomorrow when it only sees a time.
    let h = HarnessBuilder::new(|text| {
        if text.ends_with("6pm") {
            Some(scheduling("picnic", at(29, 18, 0), 0.9))
        } else {
            Some(date_only("picnic", 28))
        }
    })
    .build();

    let first = h
        .service
        .handle_message_at(CHAT, "picnic later today", now())
        .await;
    assert!(first.needs_clarification);
    assert!(first.text.contains("picnic on 28 May 2025"));
    assert_eq!(
        h.service.store().get(CHAT).map(|p| p.kind),
        Some(ClarificationKind::Time)
    );

    let second = h.service.handle_message_at(CHAT, "6pm", now()).await;

    assert_eq!(
        h.last_extraction_text().as_deref(),
        Some("I want to picnic today at 6pm")
    );
    assert_eq!(
        second.text,
        "Great! I've scheduled 'picnic' for 28 May 2025, 6:00 PM. The weather looks good!"
    );
    assert_eq!(h.calendar_events()[0].start, at(28, 18, 0));
    assert!(h.service.store().is_empty());
}

#[tokio::test]
async fn time_reply_uses_weekday_for_later_dates() {
    let h = HarnessBuilder::new(|text| {
        if text.ends_with("noon") {
            Some(scheduling("hike", at(31, 12, 0), 0.8))
        } else {
            Some(date_only("hike", 31))
        }
    })
    .build();

    h.service.handle_message_at(CHAT, "hike on saturday", now()).await;
    let reply = h.service.handle_message_at(CHAT, "noon", now()).await;

    assert_eq!(
        h.last_extraction_text().as_deref(),
        Some("I want to hike Saturday at noon")
    );
    assert!(reply.text.contains("31 May 2025, 12:00 PM"));
}

#[tokio::test]
async fn vague_time_reply_reasks_and_keeps_pending() {
    // Re-extraction never finds a time of day.
    let h = HarnessBuilder::new(|_| Some(date_only("picnic", 29))).build();

    h.service.handle_message_at(CHAT, "picnic tomorrow", now()).await;
    let created_at = h.service.store().get(CHAT).unwrap().created_at;

    let reply = h.service.handle_message_at(CHAT, "whenever", now()).await;

    assert!(reply.needs_clarification);
    assert!(reply.text.starts_with("I couldn't understand the time."));
    assert!(reply.text.contains("picnic on 29 May 2025"));
    let pending = h.service.store().get(CHAT).unwrap();
    assert_eq!(pending.kind, ClarificationKind::Time);
    assert_eq!(pending.created_at, created_at);
}

#[tokio::test]
async fn reask_shows_the_vague_time_of_day() {
    // "tomorrow morning" comes back as 09:00 without a specific time.
    let h = HarnessBuilder::new(|_| {
        Some(Intent {
            has_specific_time: false,
            ..scheduling("run", at(29, 9, 0), 0.85)
        })
    })
    .build();

    let first = h
        .service
        .handle_message_at(CHAT, "run tomorrow morning", now())
        .await;
    assert!(first.text.contains("run on 29 May 2025, 9:00 AM"));

    let reply = h.service.handle_message_at(CHAT, "sometime", now()).await;
    assert!(reply.text.starts_with("I couldn't understand the time."));
    assert!(reply.text.contains("run on 29 May 2025, 9:00 AM"));
}

#[tokio::test]
async fn low_confidence_time_reply_is_rejected() {
    let h = HarnessBuilder::new(|text| {
        if text.ends_with("ish") {
            Some(scheduling("picnic", at(29, 17, 0), 0.7))
        } else {
            Some(date_only("picnic", 29))
        }
    })
    .build();

    h.service.handle_message_at(CHAT, "picnic tomorrow", now()).await;
    let reply = h.service.handle_message_at(CHAT, "5ish", now()).await;

    assert!(reply.needs_clarification);
    assert!(h.calendar_events().is_empty());
    assert!(h.service.store().get(CHAT).is_some());
}

#[tokio::test]
async fn resolved_time_with_rain_becomes_weather_question() {
    let h = HarnessBuilder::new(|text| {
        if text.ends_with("3pm") {
            Some(scheduling("picnic", at(29, 15, 0), 0.9))
        } else {
            Some(date_only("picnic", 29))
        }
    })
    .weather(Some("moderate rain"))
    .build();

    h.service.handle_message_at(CHAT, "picnic tomorrow", now()).await;
    let reply = h.service.handle_message_at(CHAT, "3pm", now()).await;

    assert!(reply.needs_clarification);
    assert!(reply.text.contains("moderate rain"));
    let pending = h.service.store().get(CHAT).unwrap();
    assert_eq!(pending.kind, ClarificationKind::Weather);
    assert_eq!(pending.original_intent.target_time, at(29, 15, 0));
}

// ---------------------------------------------------------------------------
// Weather clarification
// ---------------------------------------------------------------------------

async fn rainy_harness() -> Harness {
    let h = HarnessBuilder::new(run_tomorrow_at_3pm)
        .weather(Some("light rain"))
        .build();
    let reply = h
        .service
        .handle_message_at(CHAT, "run tomorrow 3pm", now())
        .await;
    assert!(reply.needs_clarification);
    assert!(reply.text.contains("light rain"));
    assert_eq!(
        h.service.store().get(CHAT).map(|p| p.kind),
        Some(ClarificationKind::Weather)
    );
    h
}

#[tokio::test]
async fn proceed_schedules_without_rechecking_weather() {
    let h = rainy_harness().await;

    let reply = h.service.handle_message_at(CHAT, "proceed", now()).await;

    assert_eq!(
        reply.text,
        "Great! I've scheduled 'run' for 29 May 2025, 3:00 PM despite the weather. Stay safe!"
    );
    assert_eq!(h.weather_calls(), 1);
    assert_eq!(h.extraction_calls(), 1);
    assert_eq!(h.calendar_events().len(), 1);
    assert!(h.service.store().is_empty());
}

#[tokio::test]
async fn cancel_clears_pending() {
    let h = rainy_harness().await;

    let reply = h.service.handle_message_at(CHAT, "3", now()).await;

    assert!(reply.text.starts_with("No problem! I've cancelled your run plan."));
    assert!(h.calendar_events().is_empty());
    assert!(h.service.store().is_empty());
}

#[tokio::test]
async fn reschedule_clears_pending_and_asks_for_time() {
    let h = rainy_harness().await;

    let reply = h.service.handle_message_at(CHAT, "reschedule", now()).await;

    assert!(reply.text.contains("reschedule"));
    assert!(h.calendar_events().is_empty());
    assert!(h.service.store().is_empty());
}

#[tokio::test]
async fn unrecognized_choice_reasks_and_keeps_pending() {
    let h = rainy_harness().await;

    let reply = h.service.handle_message_at(CHAT, "hmm", now()).await;

    assert!(reply.needs_clarification);
    assert!(reply.text.starts_with("I didn't quite understand."));
    assert_eq!(
        h.service.store().get(CHAT).map(|p| p.kind),
        Some(ClarificationKind::Weather)
    );
}

// ---------------------------------------------------------------------------
// Context lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_request_overrides_pending_time_question() {
    let h = HarnessBuilder::new(|text| {
        if text.contains("run") {
            Some(scheduling("run", at(29, 17, 0), 0.9))
        } else {
            Some(date_only("picnic", 29))
        }
    })
    .build();

    h.service.handle_message_at(CHAT, "picnic tomorrow", now()).await;
    assert!(h.service.store().get(CHAT).is_some());

    let reply = h
        .service
        .handle_message_at(CHAT, "I want to go for a run tomorrow at 5pm", now())
        .await;

    assert_eq!(
        h.last_extraction_text().as_deref(),
        Some("I want to go for a run tomorrow at 5pm")
    );
    assert!(reply.text.contains("'run' for 29 May 2025, 5:00 PM"));
    assert!(h.service.store().is_empty());
}

#[tokio::test]
async fn expired_pending_is_ignored() {
    let h = HarnessBuilder::new(|text| {
        if text == "3pm" {
            None
        } else if text.ends_with("3pm") {
            Some(scheduling("picnic", at(29, 15, 0), 0.9))
        } else {
            Some(date_only("picnic", 29))
        }
    })
    .build();

    h.service.handle_message_at(CHAT, "picnic tomorrow", now()).await;

    let late = now() + TimeDelta::seconds(601);
    let reply = h.service.handle_message_at(CHAT, "3pm", late).await;

    // Treated as a fresh message, which the extractor cannot parse alone.
    assert_eq!(h.last_extraction_text().as_deref(), Some("3pm"));
    assert!(reply.text.starts_with("I'm not sure I understood"));
    assert!(h.service.store().is_empty());
}

#[tokio::test]
async fn pending_within_ttl_is_resolved() {
    let h = HarnessBuilder::new(|text| {
        if text.ends_with("3pm") && text.starts_with("I want to") {
            Some(scheduling("picnic", at(29, 15, 0), 0.9))
        } else {
            Some(date_only("picnic", 29))
        }
    })
    .build();

    h.service.handle_message_at(CHAT, "picnic tomorrow", now()).await;

    let soon = now() + TimeDelta::seconds(599);
    let reply = h.service.handle_message_at(CHAT, "3pm", soon).await;

    assert!(reply.text.starts_with("Great! I've scheduled 'picnic'"));
}

#[tokio::test]
async fn panic_in_turn_apologizes_and_leaves_store_untouched() {
    let h = HarnessBuilder::new(|text| {
        if text.starts_with("I want to") {
            panic!("extractor blew up");
        }
        Some(date_only("picnic", 29))
    })
    .build();

    h.service.handle_message_at(CHAT, "picnic tomorrow", now()).await;
    let before = h.service.store().get(CHAT).unwrap();

    let reply = h.service.handle_message_at(CHAT, "6pm", now()).await;

    assert_eq!(reply.text, "Sorry, I encountered an error. Please try again.");
    assert!(!reply.needs_clarification);
    assert_eq!(h.service.store().get(CHAT), Some(before));
}

#[tokio::test]
async fn conversations_do_not_share_pending_state() {
    let h = HarnessBuilder::new(|_| Some(date_only("picnic", 29))).build();

    h.service
        .handle_message_at(ConversationId(1), "picnic tomorrow", now())
        .await;

    assert!(h.service.store().get(ConversationId(1)).is_some());
    assert!(h.service.store().get(ConversationId(2)).is_none());
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn same_conversation_turns_are_serialized() {
    let h = HarnessBuilder::new(|_| Some(casual()))
        .extraction_delay(Duration::from_millis(30))
        .build();

    tokio::join!(
        h.service.handle_message_at(CHAT, "hello", now()),
        h.service.handle_message_at(CHAT, "hello again", now()),
    );

    assert_eq!(h.extraction_calls(), 2);
    assert_eq!(h.extractor.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn different_conversations_run_concurrently() {
    let h = HarnessBuilder::new(|_| Some(casual()))
        .extraction_delay(Duration::from_millis(30))
        .build();

    tokio::join!(
        h.service.handle_message_at(ConversationId(1), "hello", now()),
        h.service.handle_message_at(ConversationId(2), "hello", now()),
    );

    assert_eq!(h.extractor.max_in_flight.load(Ordering::SeqCst), 2);
}
