//! Reading the current selection from the frontmost application.
//!
//! The focused element is asked directly first. If it has no selection or
//! does not expose one, the selection is copied with a synthetic shortcut
//! and picked up from the clipboard once its change counter moves.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::config::AcquisitionConfig;
use crate::platform::{FocusedText, SelectionReadError, SystemClipboard};
use crate::replace::ClipboardLease;
use crate::timing::Clock;

/// The selection, exactly as captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredSelection {
    /// Selected text.
    pub text: String,
    /// Whether the clipboard path produced it.
    pub via_fallback: bool,
}

/// Why no selection could be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    /// Nothing is selected, or copying it produced nothing.
    #[error("no text selected")]
    NoTextSelected,

    /// The focused element is a password field.
    #[error("secure text field")]
    SecureFieldBlocked,
}

/// An acquired selection and, if the clipboard was used, the lease that
/// puts the user's clipboard back.
#[derive(Debug)]
pub struct Acquisition {
    /// The captured selection.
    pub selection: AcquiredSelection,
    /// Clipboard snapshot taken before the copy shortcut.
    pub lease: Option<ClipboardLease>,
}

/// Captures the current selection.
pub struct SelectionAcquirer {
    focus: Arc<dyn FocusedText>,
    clipboard: Arc<dyn SystemClipboard>,
    clock: Arc<dyn Clock>,
    config: AcquisitionConfig,
}

impl SelectionAcquirer {
    /// Create an acquirer.
    pub fn new(
        focus: Arc<dyn FocusedText>,
        clipboard: Arc<dyn SystemClipboard>,
        clock: Arc<dyn Clock>,
        config: AcquisitionConfig,
    ) -> Self {
        Self {
            focus,
            clipboard,
            clock,
            config,
        }
    }

    /// Acquire the selection of `app`.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::SecureFieldBlocked`] without touching the
    /// clipboard when a password field is focused, and
    /// [`AcquisitionError::NoTextSelected`] when neither path yields text.
    pub async fn acquire(&self, app: Option<&str>) -> Result<Acquisition, AcquisitionError> {
        let clipboard_first = app.is_some_and(|app| self.config.is_clipboard_first(app));

        if clipboard_first {
            debug!(app, "Skipping direct read for clipboard-first app");
        } else {
            match self.focus.read_selection() {
                Ok(text) if !text.is_empty() => {
                    debug!(len = text.len(), "Read selection directly");
                    return Ok(Acquisition {
                        selection: AcquiredSelection {
                            text,
                            via_fallback: false,
                        },
                        lease: None,
                    });
                }
                Ok(_) | Err(SelectionReadError::NoSelection) => {
                    debug!("No direct selection, trying the clipboard");
                }
                Err(SelectionReadError::SecureField) => {
                    debug!("Focused field is secure, not reading it");
                    return Err(AcquisitionError::SecureFieldBlocked);
                }
                Err(SelectionReadError::Unavailable(reason)) => {
                    debug!(%reason, "Direct read unavailable, trying the clipboard");
                }
            }
        }

        self.acquire_via_clipboard().await
    }

    async fn acquire_via_clipboard(&self) -> Result<Acquisition, AcquisitionError> {
        let lease = if self.config.restore_clipboard {
            match ClipboardLease::take(self.clipboard.clone()) {
                Ok(lease) => Some(lease),
                Err(e) => {
                    warn!(error = %e, "Could not save clipboard, it will not be restored");
                    None
                }
            }
        } else {
            None
        };

        if let Err(e) = self.clipboard.clear() {
            warn!(error = %e, "Could not clear clipboard before copying");
        }
        let baseline = self.clipboard.change_count();

        if let Err(e) = self.clipboard.synthesize_copy() {
            warn!(error = %e, "Could not send copy shortcut");
            return Err(AcquisitionError::NoTextSelected);
        }

        if self.wait_for_change(baseline).await {
            self.clock.sleep(self.config.grace_delay()).await;
        } else {
            debug!(timeout = ?self.config.timeout(), "Clipboard did not change before timeout");
        }

        match self.clipboard.read() {
            Ok(Some(text)) if !text.is_empty() => {
                debug!(len = text.len(), "Read selection via clipboard");
                Ok(Acquisition {
                    selection: AcquiredSelection {
                        text,
                        via_fallback: true,
                    },
                    lease,
                })
            }
            Ok(_) => Err(AcquisitionError::NoTextSelected),
            Err(e) => {
                warn!(error = %e, "Could not read clipboard after copying");
                Err(AcquisitionError::NoTextSelected)
            }
        }
    }

    /// Poll the change counter until it moves or the timeout elapses.
    async fn wait_for_change(&self, baseline: u64) -> bool {
        let deadline = self.clock.now() + self.config.timeout();
        let interval = self.config.poll_interval();
        loop {
            self.clock.sleep(interval).await;
            if self.clipboard.change_count() != baseline {
                trace!("Clipboard changed");
                return true;
            }
            if self.clock.now() >= deadline {
                return false;
            }
        }
    }
}

impl fmt::Debug for SelectionAcquirer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionAcquirer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
