//! Operation types shared by the pipeline, storage and CLI.
//!
//! An operation is one correction or translation of the user's selection.
//! Each one that gets past the configuration gates leaves exactly one
//! [`OperationRecord`] behind.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::replace::ReplacementMethod;
use crate::transform::TransformError;

/// What an operation does to the selected text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Fix spelling and grammar, written back in place.
    Correction,
    /// Translate into the target language, delivered on the clipboard.
    Translation,
}

impl OperationKind {
    /// Stable lowercase name used in storage and environment variables.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correction => "correction",
            Self::Translation => "translation",
        }
    }

    /// Capitalized label for notifications.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Correction => "Correction",
            Self::Translation => "Translation",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "correction" => Ok(Self::Correction),
            "translation" => Ok(Self::Translation),
            other => Err(format!("unknown operation kind: {other}")),
        }
    }
}

/// A completed or failed operation, as kept in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Unique identifier (assigned by storage layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// When the operation finished.
    pub timestamp: DateTime<Utc>,

    /// Correction or translation.
    pub kind: OperationKind,

    /// Frontmost application when the operation started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_app: Option<String>,

    /// The acquired selection. Empty when acquisition failed.
    pub input_text: String,

    /// The unmasked result. Empty when no result was produced.
    pub output_text: String,

    /// Whether the operation delivered its result.
    pub success: bool,

    /// Whether the result was written through the focused element.
    pub replaced_directly: bool,

    /// Original spellings of the protected words that were masked.
    pub protected_words: Vec<String>,

    /// Wall time from start to finish in milliseconds.
    pub latency_ms: u64,

    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationRecord {
    /// Start a record for `kind` stamped with the current time.
    #[must_use]
    pub fn new(kind: OperationKind, source_app: Option<String>) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            kind,
            source_app,
            input_text: String::new(),
            output_text: String::new(),
            success: false,
            replaced_directly: false,
            protected_words: Vec::new(),
            latency_ms: 0,
            error: None,
        }
    }

    /// Set the latency, saturating at `u64::MAX` milliseconds.
    pub fn set_latency(&mut self, elapsed: Duration) {
        self.latency_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    }

    /// Length of the input in characters.
    #[must_use]
    pub fn input_chars(&self) -> usize {
        self.input_text.chars().count()
    }
}

/// Receives operation records. Appends are fire and forget.
pub trait HistorySink: Send + Sync {
    /// Store `record`. Implementations log failures instead of returning them.
    fn append(&self, record: &OperationRecord);
}

/// Why an operation did not deliver a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationFailure {
    /// The user has not agreed to send text to the transformer.
    #[error("consent to send text to the transformer has not been granted")]
    ConsentRequired,

    /// No transformer command is configured.
    #[error("no transformer is configured")]
    NotConfigured,

    /// Nothing is selected, or the selection could not be captured.
    #[error("no text selected")]
    NoTextSelected,

    /// The focused field is a password field.
    #[error("secure text fields cannot be read")]
    SecureField,

    /// The selection is longer than the configured maximum.
    #[error("selection is {length} characters, the maximum is {max}")]
    TooLong {
        /// Selection length in characters.
        length: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The protected-word list could not be read, so nothing was sent.
    #[error("protected words could not be loaded: {0}")]
    WordsUnavailable(String),

    /// The transformer failed.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The result could not be written back or placed on the clipboard.
    #[error("could not deliver the result: {0}")]
    Delivery(String),
}

impl OperationFailure {
    /// Whether this failure happened before the selection was touched.
    #[must_use]
    pub fn is_pre_acquisition(&self) -> bool {
        matches!(self, Self::ConsentRequired | Self::NotConfigured)
    }
}

/// Terminal state of a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The result was delivered.
    Completed {
        /// Correction or translation.
        kind: OperationKind,
        /// How the result reached the user.
        method: ReplacementMethod,
    },

    /// The operation stopped early.
    Failed {
        /// Correction or translation.
        kind: OperationKind,
        /// What went wrong.
        failure: OperationFailure,
    },

    /// Another operation was already running; this one was ignored.
    Busy,
}

impl OperationOutcome {
    /// Whether the result was delivered.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// The failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&OperationFailure> {
        match self {
            Self::Failed { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display_and_parse() {
        for kind in [OperationKind::Correction, OperationKind::Translation] {
            assert_eq!(kind.to_string().parse::<OperationKind>(), Ok(kind));
        }
        assert!("rewrite".parse::<OperationKind>().is_err());
    }

    #[test]
    fn test_kind_label() {
        assert_eq!(OperationKind::Correction.label(), "Correction");
        assert_eq!(OperationKind::Translation.label(), "Translation");
    }

    #[test]
    fn test_kind_serialize() {
        let json = serde_json::to_string(&OperationKind::Translation).unwrap();
        assert_eq!(json, "\"translation\"");
    }

    #[test]
    fn test_new_record_defaults() {
        let record = OperationRecord::new(OperationKind::Correction, Some("Notes".to_string()));
        assert!(record.id.is_none());
        assert!(!record.success);
        assert!(!record.replaced_directly);
        assert!(record.input_text.is_empty());
        assert_eq!(record.source_app.as_deref(), Some("Notes"));
    }

    #[test]
    fn test_set_latency() {
        let mut record = OperationRecord::new(OperationKind::Correction, None);
        record.set_latency(Duration::from_millis(1_234));
        assert_eq!(record.latency_ms, 1_234);
    }

    #[test]
    fn test_input_chars_counts_characters() {
        let mut record = OperationRecord::new(OperationKind::Correction, None);
        record.input_text = "héllo".to_string();
        assert_eq!(record.input_chars(), 5);
    }

    #[test]
    fn test_record_serialize_skips_missing_fields() {
        let record = OperationRecord::new(OperationKind::Correction, None);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(!json.contains("source_app"));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_failure_display() {
        let failure = OperationFailure::TooLong {
            length: 12,
            max: 10,
        };
        assert_eq!(
            failure.to_string(),
            "selection is 12 characters, the maximum is 10"
        );
        assert_eq!(
            OperationFailure::from(TransformError::RateLimited).to_string(),
            TransformError::RateLimited.to_string()
        );
    }

    #[test]
    fn test_pre_acquisition_failures() {
        assert!(OperationFailure::ConsentRequired.is_pre_acquisition());
        assert!(OperationFailure::NotConfigured.is_pre_acquisition());
        assert!(!OperationFailure::NoTextSelected.is_pre_acquisition());
    }

    #[test]
    fn test_outcome_helpers() {
        let done = OperationOutcome::Completed {
            kind: OperationKind::Correction,
            method: ReplacementMethod::DirectWrite,
        };
        assert!(done.is_success());
        assert!(done.failure().is_none());

        let failed = OperationOutcome::Failed {
            kind: OperationKind::Translation,
            failure: OperationFailure::NoTextSelected,
        };
        assert!(!failed.is_success());
        assert_eq!(failed.failure(), Some(&OperationFailure::NoTextSelected));
        assert!(!OperationOutcome::Busy.is_success());
    }
}
