//! The operation pipeline.
//!
//! An operation runs acquire, validate, mask, transform, unmask, replace and
//! record strictly in sequence with no retries. Every terminal state produces
//! exactly one notice. Every operation that gets past the configuration
//! gates produces exactly one history record.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::acquire::{AcquisitionError, SelectionAcquirer};
use crate::config::{Config, TransformerConfig};
use crate::masking::{mask, unmask};
use crate::notify::{Notice, Notifier};
use crate::operation::{
    HistorySink, OperationFailure, OperationKind, OperationOutcome, OperationRecord,
};
use crate::platform::{FocusedText, SystemClipboard};
use crate::replace::{ReplacementMethod, Replacer};
use crate::timing::Clock;
use crate::transform::{PromptConfig, TransformError, Transformer};
use crate::words::WordSource;

/// Limits and gates applied to every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSettings {
    /// Maximum selection length in characters.
    pub max_text_length: usize,
    /// Upper bound on the transformer call.
    pub transform_timeout: Duration,
    /// Target language for translations.
    pub target_language: String,
    /// Whether the user agreed to send text to the transformer.
    pub consent_granted: bool,
}

impl OperationSettings {
    /// Build settings from the transformer section.
    #[must_use]
    pub fn from_config(config: &TransformerConfig) -> Self {
        Self {
            max_text_length: config.max_text_length,
            transform_timeout: Duration::from_secs(config.timeout_secs),
            target_language: config.target_language.clone(),
            consent_granted: config.consent_granted,
        }
    }
}

/// Everything the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Focused-element access.
    pub focus: Arc<dyn FocusedText>,
    /// Clipboard and shortcut access.
    pub clipboard: Arc<dyn SystemClipboard>,
    /// Language-model backend.
    pub transformer: Arc<dyn Transformer>,
    /// Protected-word snapshot provider.
    pub words: Arc<dyn WordSource>,
    /// Where operation records go.
    pub history: Arc<dyn HistorySink>,
    /// User-visible notices.
    pub notifier: Arc<dyn Notifier>,
    /// Time source for polling and delays.
    pub clock: Arc<dyn Clock>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Runs corrections and translations one at a time.
pub struct Orchestrator {
    focus: Arc<dyn FocusedText>,
    acquirer: SelectionAcquirer,
    replacer: Replacer,
    transformer: Arc<dyn Transformer>,
    words: Arc<dyn WordSource>,
    history: Arc<dyn HistorySink>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: OperationSettings,
    in_flight: Mutex<()>,
}

impl Orchestrator {
    /// Wire the pipeline from configuration and collaborators.
    #[must_use]
    pub fn new(config: &Config, parts: Collaborators) -> Self {
        let acquirer = SelectionAcquirer::new(
            parts.focus.clone(),
            parts.clipboard.clone(),
            parts.clock.clone(),
            config.acquisition.clone(),
        );
        let replacer = Replacer::new(
            parts.focus.clone(),
            parts.clipboard,
            parts.clock.clone(),
            config.replacement.clone(),
        );
        Self {
            focus: parts.focus,
            acquirer,
            replacer,
            transformer: parts.transformer,
            words: parts.words,
            history: parts.history,
            notifier: parts.notifier,
            clock: parts.clock,
            settings: OperationSettings::from_config(&config.transformer),
            in_flight: Mutex::new(()),
        }
    }

    /// Replace the settings derived from configuration.
    #[must_use]
    pub fn with_settings(mut self, settings: OperationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Correct the selection and write it back in place.
    pub async fn run_correction(&self) -> OperationOutcome {
        self.run(OperationKind::Correction).await
    }

    /// Translate the selection and leave the result on the clipboard.
    pub async fn run_translation(&self) -> OperationOutcome {
        self.run(OperationKind::Translation).await
    }

    /// Run one operation of `kind`.
    ///
    /// Returns [`OperationOutcome::Busy`] without doing anything if another
    /// operation is in flight.
    pub async fn run(&self, kind: OperationKind) -> OperationOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            info!(%kind, "Ignoring request while another operation is running");
            self.notifier.notify(&Notice::info(
                "Busy",
                "Another operation is still running",
            ));
            return OperationOutcome::Busy;
        };

        let started = self.clock.now();

        if let Some(failure) = self.check_gates() {
            info!(%kind, %failure, "Operation refused");
            self.notifier.notify(&failure_notice(kind, &failure));
            return OperationOutcome::Failed { kind, failure };
        }

        let app = self.focus.active_app();
        let mut record = OperationRecord::new(kind, app.clone());
        debug!(%kind, app = app.as_deref().unwrap_or("unknown"), "Starting operation");

        let acquisition = match self.acquirer.acquire(app.as_deref()).await {
            Ok(acquisition) => acquisition,
            Err(e) => {
                let failure = match e {
                    AcquisitionError::NoTextSelected => OperationFailure::NoTextSelected,
                    AcquisitionError::SecureFieldBlocked => OperationFailure::SecureField,
                };
                return self.fail(record, started, failure);
            }
        };
        let selection = acquisition.selection;
        let lease = acquisition.lease;
        record.input_text.clone_from(&selection.text);

        let length = record.input_chars();
        if length > self.settings.max_text_length {
            drop(lease);
            return self.fail(
                record,
                started,
                OperationFailure::TooLong {
                    length,
                    max: self.settings.max_text_length,
                },
            );
        }

        let words = match self.words.current_words() {
            Ok(words) => words,
            Err(e) => {
                drop(lease);
                return self.fail(
                    record,
                    started,
                    OperationFailure::WordsUnavailable(e.to_string()),
                );
            }
        };
        let masked = mask(&selection.text, &words);
        record.protected_words.clone_from(&masked.tokens_used_in_order);
        debug!(matches = masked.match_count(), "Masked protected words");

        let prompt = PromptConfig::for_kind(kind, &self.settings.target_language);
        let response = match tokio::time::timeout(
            self.settings.transform_timeout,
            self.transformer.transform(kind, &masked.masked_text, &prompt),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                drop(lease);
                return self.fail(record, started, e.into());
            }
            Err(_) => {
                drop(lease);
                return self.fail(record, started, TransformError::Timeout.into());
            }
        };

        let output = unmask(&response, &masked.mapping);
        record.output_text.clone_from(&output);

        let outcome = match kind {
            OperationKind::Correction => {
                self.replacer
                    .replace(&output, app.as_deref(), selection.via_fallback, lease)
                    .await
            }
            OperationKind::Translation => self.replacer.deliver_to_clipboard(&output, lease),
        };
        record.replaced_directly =
            outcome.succeeded && outcome.method == ReplacementMethod::DirectWrite;

        if !outcome.succeeded {
            let failure = OperationFailure::Delivery(format!("{} failed", outcome.method));
            return self.fail(record, started, failure);
        }

        record.success = true;
        self.finish(&mut record, started);
        info!(%kind, method = %outcome.method, latency_ms = record.latency_ms, "Operation completed");
        self.notifier.notify(&success_notice(kind, outcome.method));

        OperationOutcome::Completed {
            kind,
            method: outcome.method,
        }
    }

    fn check_gates(&self) -> Option<OperationFailure> {
        if !self.settings.consent_granted {
            Some(OperationFailure::ConsentRequired)
        } else if !self.transformer.is_configured() {
            Some(OperationFailure::NotConfigured)
        } else {
            None
        }
    }

    fn finish(&self, record: &mut OperationRecord, started: Duration) {
        record.set_latency(self.clock.now().saturating_sub(started));
        self.history.append(record);
    }

    fn fail(
        &self,
        mut record: OperationRecord,
        started: Duration,
        failure: OperationFailure,
    ) -> OperationOutcome {
        let kind = record.kind;
        warn!(%kind, %failure, "Operation failed");
        record.success = false;
        record.error = Some(failure.to_string());
        self.finish(&mut record, started);
        self.notifier.notify(&failure_notice(kind, &failure));
        OperationOutcome::Failed { kind, failure }
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings)
            .field("acquirer", &self.acquirer)
            .field("replacer", &self.replacer)
            .finish_non_exhaustive()
    }
}

fn success_notice(kind: OperationKind, method: ReplacementMethod) -> Notice {
    match (kind, method) {
        (OperationKind::Translation, _) | (_, ReplacementMethod::ClipboardCopy) => Notice::success(
            format!("{} ready", kind.label()),
            "The result is on the clipboard",
        ),
        (_, ReplacementMethod::DirectWrite) => {
            Notice::success(format!("{} applied", kind.label()), "Selection replaced")
        }
        (_, ReplacementMethod::ClipboardPaste) => Notice::success(
            format!("{} applied", kind.label()),
            "Selection replaced by pasting",
        ),
    }
}

fn failure_notice(kind: OperationKind, failure: &OperationFailure) -> Notice {
    Notice::failure(format!("{} failed", kind.label()), failure.to_string())
}
