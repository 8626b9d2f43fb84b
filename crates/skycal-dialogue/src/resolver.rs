//! Clarification resolution.
//!
//! When a conversation has a pending clarification, the next message is
//! usually a short answer ("3pm", "cancel") rather than a full request.  The
//! resolver interprets that answer against the stored context and decides
//! what happens to the pending entry.  It never writes the store itself; the
//! decision travels back as a [`ContextUpdate`].

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::context::{ClarificationKind, ConversationId, PendingClarification};
use crate::error::{DialogueError, Result};
use crate::format::intent_time;
use crate::keywords::{CANCEL_SET, PROCEED_SET, RESCHEDULE_SET, SCHEDULING_SET};
use crate::replies;
use crate::workflow::{Step, TurnState, WorkflowEngine};

/// A re-extracted time is accepted only above this confidence.
pub const TIME_REPLY_MIN_CONFIDENCE: f64 = 0.7;

/// A message needs more than this many words to count as a new request.
const NEW_REQUEST_MIN_WORDS: usize = 3;

/// What to do with the pending entry once the turn completes.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextUpdate {
    /// Leave the entry as it is.
    Keep,
    /// Remove the entry.
    Clear,
    /// Store a new entry in place of any existing one.
    Replace(PendingClarification),
}

impl ContextUpdate {
    pub fn from_pending(pending: Option<PendingClarification>) -> Self {
        pending.map_or(Self::Clear, Self::Replace)
    }
}

/// The reply to a clarification answer plus the context decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub text: String,
    pub needs_clarification: bool,
    pub update: ContextUpdate,
}

/// Answer to a rainy-weather question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherDecision {
    Proceed,
    Reschedule,
    Cancel,
    Unrecognized,
}

impl WeatherDecision {
    /// Classify a reply; proceed wins over reschedule, which wins over
    /// cancel.
    pub fn classify(reply: &str) -> Self {
        let tables = [
            (&*PROCEED_SET, Self::Proceed),
            (&*RESCHEDULE_SET, Self::Reschedule),
            (&*CANCEL_SET, Self::Cancel),
        ];
        for (set, decision) in tables {
            if let Some(phrase) = set.first_match(reply) {
                tracing::debug!(phrase, decision = ?decision, "weather reply classified");
                return decision;
            }
        }
        Self::Unrecognized
    }
}

/// Whether `text` reads as a fresh request that should override a pending
/// clarification: it mentions scheduling and has more than three words.
pub fn looks_like_new_request(text: &str) -> bool {
    SCHEDULING_SET.matches(text) && text.split_whitespace().count() > NEW_REQUEST_MIN_WORDS
}

/// Relative reference for `target` as seen from `today`: "today",
/// "tomorrow", "yesterday", or the weekday name.
pub fn date_reference(target: NaiveDate, today: NaiveDate) -> String {
    match (target - today).num_days() {
        0 => "today".to_owned(),
        1 => "tomorrow".to_owned(),
        -1 => "yesterday".to_owned(),
        _ => target.format("%A").to_string(),
    }
}

/// Put the hour and minute of `extracted` on the date of `original`.
/// Seconds are zeroed.
pub fn keep_original_date(original: NaiveDateTime, extracted: NaiveDateTime) -> Result<NaiveDateTime> {
    let date = original.date();
    let (hour, minute) = (extracted.hour(), extracted.minute());
    date.and_hms_opt(hour, minute, 0)
        .ok_or(DialogueError::InvalidTime { date, hour, minute })
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves follow-up replies against a pending clarification.
pub struct ClarificationResolver {
    engine: Arc<WorkflowEngine>,
}

impl ClarificationResolver {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self { engine }
    }

    /// Interpret `reply` as the answer to `pending`.
    pub async fn resolve(
        &self,
        conversation_id: ConversationId,
        pending: &PendingClarification,
        reply: &str,
        now: NaiveDateTime,
    ) -> Result<Resolution> {
        tracing::info!(
            conversation_id = %conversation_id,
            kind = ?pending.kind,
            "resolving clarification"
        );
        match pending.kind {
            ClarificationKind::Time => self.resolve_time(conversation_id, pending, reply, now).await,
            ClarificationKind::Weather => Ok(self.resolve_weather(pending, reply).await),
        }
    }

    async fn resolve_time(
        &self,
        conversation_id: ConversationId,
        pending: &PendingClarification,
        reply: &str,
        now: NaiveDateTime,
    ) -> Result<Resolution> {
        let original = &pending.original_intent;
        let original_date = original.target_time.date();
        let combined = format!(
            "I want to {} {} at {}",
            original.activity,
            date_reference(original_date, now.date()),
            reply.trim()
        );
        tracing::debug!(conversation_id = %conversation_id, combined = %combined, "re-extracting with time reply");

        let updated = self.engine.extract_intent(&combined, now).await;
        if !(updated.has_specific_time && updated.confidence > TIME_REPLY_MIN_CONFIDENCE) {
            tracing::info!(
                conversation_id = %conversation_id,
                confidence = updated.confidence,
                has_specific_time = updated.has_specific_time,
                "time reply not understood"
            );
            return Ok(Resolution {
                text: replies::time_not_understood(&original.activity, &intent_time(original)),
                needs_clarification: true,
                update: ContextUpdate::Keep,
            });
        }

        let corrected = if updated.target_time.date() == original_date {
            updated
        } else {
            tracing::debug!(
                extracted = %updated.target_time,
                original = %original.target_time,
                "re-extraction moved the date, keeping the original date"
            );
            let target_time = keep_original_date(original.target_time, updated.target_time)?;
            updated.retimed(target_time)
        };

        let state = TurnState::new(conversation_id, combined).with_intent(corrected);
        let outcome = self.engine.run_from(Step::CheckWeather, state, now).await;
        Ok(Resolution {
            update: ContextUpdate::from_pending(outcome.pending_clarification(now)),
            needs_clarification: outcome.state.needs_clarification,
            text: outcome.state.response_text,
        })
    }

    async fn resolve_weather(&self, pending: &PendingClarification, reply: &str) -> Resolution {
        let intent = &pending.original_intent;
        let decision = WeatherDecision::classify(reply);
        tracing::info!(decision = ?decision, activity = %intent.activity, "weather decision");

        match decision {
            WeatherDecision::Proceed => {
                let text = if self.engine.create_event(intent).await {
                    replies::scheduled_despite_weather(&intent.activity, &intent_time(intent))
                } else {
                    replies::calendar_failed().to_owned()
                };
                Resolution {
                    text,
                    needs_clarification: false,
                    update: ContextUpdate::Clear,
                }
            }
            WeatherDecision::Reschedule => Resolution {
                text: replies::reschedule_prompt().to_owned(),
                needs_clarification: false,
                update: ContextUpdate::Clear,
            },
            WeatherDecision::Cancel => Resolution {
                text: replies::cancelled(&intent.activity),
                needs_clarification: false,
                update: ContextUpdate::Clear,
            },
            WeatherDecision::Unrecognized => Resolution {
                text: replies::weather_choice_reprompt(),
                needs_clarification: true,
                update: ContextUpdate::Keep,
            },
        }
    }
}
