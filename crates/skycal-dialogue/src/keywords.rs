//! Fixed keyword tables and the case-insensitive matcher over them.
//!
//! The tables are data: changing a phrase never touches control flow.
//! Matching is substring-based, so `"hi"` also matches inside `"this"`;
//! callers rely on table order, not on word boundaries.

use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};

/// Casual greetings.
pub const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
];

/// Small-talk questions.
pub const HOW_ARE_YOU: &[&str] = &["how are you", "what's up", "how's it going"];

/// Expressions of thanks.
pub const THANKS: &[&str] = &["thank", "thanks", "appreciate"];

/// Words that mark a message as a fresh scheduling request rather than a
/// reply to a pending clarification.
pub const SCHEDULING: &[&str] = &[
    "want", "schedule", "plan", "book", "at", "tomorrow", "today", "this", "next",
];

/// Weather-clarification reply: schedule anyway.
pub const PROCEED: &[&str] = &["1", "proceed", "yes", "continue", "anyway"];

/// Weather-clarification reply: pick another time.
pub const RESCHEDULE: &[&str] = &["2", "reschedule", "different", "later", "change"];

/// Weather-clarification reply: drop the plan.
pub const CANCEL: &[&str] = &["3", "cancel", "no", "don't", "skip"];

pub static GREETING_SET: LazyLock<KeywordSet> = LazyLock::new(|| KeywordSet::new(GREETINGS));
pub static HOW_ARE_YOU_SET: LazyLock<KeywordSet> = LazyLock::new(|| KeywordSet::new(HOW_ARE_YOU));
pub static THANKS_SET: LazyLock<KeywordSet> = LazyLock::new(|| KeywordSet::new(THANKS));
pub static SCHEDULING_SET: LazyLock<KeywordSet> = LazyLock::new(|| KeywordSet::new(SCHEDULING));
pub static PROCEED_SET: LazyLock<KeywordSet> = LazyLock::new(|| KeywordSet::new(PROCEED));
pub static RESCHEDULE_SET: LazyLock<KeywordSet> = LazyLock::new(|| KeywordSet::new(RESCHEDULE));
pub static CANCEL_SET: LazyLock<KeywordSet> = LazyLock::new(|| KeywordSet::new(CANCEL));

/// A set of phrases searched for as case-insensitive substrings.
pub struct KeywordSet {
    phrases: Vec<String>,
    automaton: Option<AhoCorasick>,
}

impl KeywordSet {
    /// Compile a keyword set.  An automaton build failure is logged and
    /// leaves the set matching nothing.
    pub fn new<S: AsRef<str>>(phrases: &[S]) -> Self {
        let phrases: Vec<String> = phrases
            .iter()
            .map(|p| p.as_ref().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        let automaton = if phrases.is_empty() {
            None
        } else {
            match AhoCorasickBuilder::new()
                .ascii_case_insensitive(true)
                .build(&phrases)
            {
                Ok(ac) => Some(ac),
                Err(e) => {
                    tracing::error!(error = %e, "failed to build keyword automaton");
                    None
                }
            }
        };

        Self { phrases, automaton }
    }

    /// Whether any phrase occurs in `text`.
    pub fn matches(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.automaton.as_ref().is_some_and(|ac| ac.is_match(&lower))
    }

    /// The first phrase (by position in `text`) found, if any.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        let ac = self.automaton.as_ref()?;
        ac.find(&lower)
            .map(|m| self.phrases[m.pattern().as_usize()].as_str())
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

impl std::fmt::Debug for KeywordSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordSet")
            .field("phrases", &self.phrases)
            .finish()
    }
}
