//! Dialogue engine error types.
//!
//! Collaborator failures are absorbed by the workflow engine and never
//! surface here; [`DialogueError`] covers failures of the engine itself and
//! the errors collaborators report back through the trait seams.

/// Unified error type for the dialogue engine.
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    // -- Collaborator errors -------------------------------------------------
    /// Intent extraction could not produce a well-formed intent.
    #[error("intent extraction failed: {reason}")]
    ExtractionFailed { reason: String },

    /// The weather provider could not answer.
    #[error("weather lookup failed for `{location}`: {reason}")]
    WeatherUnavailable { location: String, reason: String },

    /// The calendar collaborator failed to persist an event.
    #[error("calendar write failed: {reason}")]
    CalendarFailed { reason: String },

    /// A collaborator call exceeded its time limit.
    #[error("{collaborator} timed out after {seconds}s")]
    Timeout {
        collaborator: &'static str,
        seconds: u64,
    },

    // -- Engine errors -------------------------------------------------------
    /// A date-time could not be constructed from the given components.
    #[error("invalid time {hour:02}:{minute:02} on {date}")]
    InvalidTime {
        date: chrono::NaiveDate,
        hour: u32,
        minute: u32,
    },

    /// Catch-all for unexpected internal errors.
    #[error("internal dialogue error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the dialogue crate.
pub type Result<T> = std::result::Result<T, DialogueError>;
