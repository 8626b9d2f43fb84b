//! Human-readable rendering of dates and labels for replies.

use chrono::{NaiveDateTime, Timelike};

use crate::intent::Intent;

/// Midnight marks a date-only target time.
pub fn is_midnight(dt: NaiveDateTime) -> bool {
    dt.hour() == 0 && dt.minute() == 0
}

/// Render a target time as `"28 May 2025, 3:00 PM"`, or `"28 May 2025"` when
/// the time of day is midnight (date-only).
pub fn human_datetime(dt: NaiveDateTime) -> String {
    if is_midnight(dt) {
        dt.format("%-d %B %Y").to_string()
    } else {
        dt.format("%-d %B %Y, %-I:%M %p").to_string()
    }
}

/// Render the target time of an intent.
pub fn intent_time(intent: &Intent) -> String {
    human_datetime(intent.target_time)
}

/// Capitalize the first letter of every whitespace-separated word.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
