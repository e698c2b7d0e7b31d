//! Protected words.
//!
//! A protected word is a literal string that must survive transformation
//! unchanged. The core only ever reads a snapshot of the current list through
//! [`WordSource`]; adding, updating and removing words is the job of the
//! storage layer and the CLI.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A user-configured word that must pass through transformation unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedWord {
    /// Identifier assigned by the storage layer (0 for unsaved words).
    pub id: i64,

    /// The literal text to protect.
    pub text: String,

    /// Match only occurrences with identical casing.
    pub case_sensitive: bool,

    /// Match only occurrences not embedded in a larger word.
    pub whole_word_only: bool,
}

impl ProtectedWord {
    /// Create an unsaved word with the default flags
    /// (case-insensitive, whole-word).
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: 0,
            text: text.into(),
            case_sensitive: false,
            whole_word_only: true,
        }
    }

    /// Set case sensitivity.
    #[must_use]
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Set whole-word anchoring.
    #[must_use]
    pub fn whole_word_only(mut self, whole_word_only: bool) -> Self {
        self.whole_word_only = whole_word_only;
        self
    }

    /// Length of the word in characters, used for longest-first ordering.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Read-only access to the current protected-word list.
pub trait WordSource: Send + Sync {
    /// A snapshot of the configured words, in their stored order.
    ///
    /// An error means the list is unknown, not empty. Callers must not treat
    /// it as "nothing to protect".
    fn current_words(&self) -> Result<Vec<ProtectedWord>>;
}

impl WordSource for Vec<ProtectedWord> {
    fn current_words(&self) -> Result<Vec<ProtectedWord>> {
        Ok(self.clone())
    }
}
