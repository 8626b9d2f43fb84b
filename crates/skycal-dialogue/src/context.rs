//! Clarification context store.
//!
//! Holds at most one [`PendingClarification`] per conversation, in memory
//! for the lifetime of the process.  Internally the store is backed by
//! [`DashMap`], so unrelated conversations never contend on a shared lock.
//!
//! Turns for the same conversation are serialized through
//! [`ClarificationStore::lock`]: a turn holds its conversation's lock from
//! the first read of the pending entry to the final write, including while
//! it waits on slow collaborators.  Other conversations are unaffected.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDateTime, TimeDelta};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::intent::Intent;
use crate::weather::Weather;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identifies one conversation on the message transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// What the pending question is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarificationKind {
    /// A time of day for a date-only request.
    Time,
    /// A proceed / reschedule / cancel decision after a rainy forecast.
    Weather,
}

/// A question asked in one turn and answerable in the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingClarification {
    pub original_intent: Intent,
    pub weather: Option<Weather>,
    pub kind: ClarificationKind,
    pub created_at: NaiveDateTime,
}

impl PendingClarification {
    /// Waiting for a time of day.
    pub fn time(original_intent: Intent, created_at: NaiveDateTime) -> Self {
        Self {
            original_intent,
            weather: None,
            kind: ClarificationKind::Time,
            created_at,
        }
    }

    /// Waiting for a decision about rainy weather.
    pub fn weather(original_intent: Intent, weather: Weather, created_at: NaiveDateTime) -> Self {
        Self {
            original_intent,
            weather: Some(weather),
            kind: ClarificationKind::Weather,
            created_at,
        }
    }

    /// Whether the entry has outlived `ttl` at `now`.  An entry exactly
    /// `ttl` old is still live.
    pub fn is_expired(&self, now: NaiveDateTime, ttl: TimeDelta) -> bool {
        now - self.created_at > ttl
    }
}

/// Exclusive access to one conversation for the duration of a turn.
pub type ConversationGuard = OwnedMutexGuard<()>;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// In-memory pending clarifications keyed by conversation.
pub struct ClarificationStore {
    entries: DashMap<ConversationId, PendingClarification>,
    locks: DashMap<ConversationId, Arc<Mutex<()>>>,
    ttl: TimeDelta,
}

impl ClarificationStore {
    /// Create an empty store whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            entries: DashMap::new(),
            locks: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Store `pending` for `id`, replacing any existing entry.
    pub fn put(&self, id: ConversationId, pending: PendingClarification) {
        tracing::debug!(conversation_id = %id, kind = ?pending.kind, "pending clarification stored");
        self.entries.insert(id, pending);
    }

    /// Snapshot of the pending entry for `id`.
    pub fn get(&self, id: ConversationId) -> Option<PendingClarification> {
        self.entries.get(&id).map(|entry| entry.value().clone())
    }

    /// Drop the pending entry for `id`, returning it if present.
    pub fn remove(&self, id: ConversationId) -> Option<PendingClarification> {
        let removed = self.entries.remove(&id).map(|(_, pending)| pending);
        if removed.is_some() {
            tracing::debug!(conversation_id = %id, "pending clarification cleared");
        }
        removed
    }

    /// Remove every entry older than the TTL at `now`.  Returns how many
    /// entries were dropped.
    pub fn sweep_expired(&self, now: NaiveDateTime) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|id, pending| {
            let expired = pending.is_expired(now, ttl);
            if expired {
                tracing::info!(conversation_id = %id, "cleaning up expired clarification");
            }
            !expired
        });

        // Locks nobody holds or waits on can be recreated on demand.
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);

        before.saturating_sub(self.entries.len())
    }

    /// Acquire the turn lock for `id`, waiting for any in-flight turn on the
    /// same conversation to finish.
    pub async fn lock(&self, id: ConversationId) -> ConversationGuard {
        let lock = self.locks.entry(id).or_default().value().clone();
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ClarificationStore {
    fn default() -> Self {
        Self::new(TimeDelta::minutes(10))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
