//! Writing results back into the focused application.
//!
//! A direct write through the focused element is tried first. When that is
//! not possible the result goes through the clipboard with a synthetic
//! paste, after which the user's clipboard is put back.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::config::ReplacementConfig;
use crate::platform::{ClipboardError, FocusedText, SavedClipboard, SystemClipboard};
use crate::timing::Clock;

/// Temporary ownership of the system clipboard.
///
/// Taking a lease snapshots the clipboard. Dropping it puts the snapshot
/// back unless [`ClipboardLease::disarm`] was called.
pub struct ClipboardLease {
    clipboard: Arc<dyn SystemClipboard>,
    saved: Option<SavedClipboard>,
}

impl ClipboardLease {
    /// Snapshot the clipboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be read.
    pub fn take(clipboard: Arc<dyn SystemClipboard>) -> Result<Self, ClipboardError> {
        let saved = clipboard.save()?;
        Ok(Self {
            clipboard,
            saved: Some(saved),
        })
    }

    /// Put the snapshot back now.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be written.
    pub fn restore(mut self) -> Result<(), ClipboardError> {
        match self.saved.take() {
            Some(saved) => self.clipboard.restore(&saved),
            None => Ok(()),
        }
    }

    /// Leave the current clipboard content in place.
    pub fn disarm(mut self) {
        self.saved = None;
    }
}

impl fmt::Debug for ClipboardLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipboardLease")
            .field("armed", &self.saved.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for ClipboardLease {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            match self.clipboard.restore(&saved) {
                Ok(()) => debug!("Restored clipboard"),
                Err(e) => warn!(error = %e, "Failed to restore clipboard"),
            }
        }
    }
}

/// How a result reached the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementMethod {
    /// Written through the focused element.
    DirectWrite,
    /// Put on the clipboard and pasted with a synthetic shortcut.
    ClipboardPaste,
    /// Left on the clipboard for the user to paste.
    ClipboardCopy,
}

impl fmt::Display for ReplacementMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectWrite => write!(f, "direct write"),
            Self::ClipboardPaste => write!(f, "clipboard paste"),
            Self::ClipboardCopy => write!(f, "clipboard copy"),
        }
    }
}

/// Result of a replacement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacementOutcome {
    /// The last method attempted.
    pub method: ReplacementMethod,
    /// Whether it was performed.
    pub succeeded: bool,
}

impl ReplacementOutcome {
    fn new(method: ReplacementMethod, succeeded: bool) -> Self {
        Self { method, succeeded }
    }
}

/// Writes results back, falling back from direct write to paste.
pub struct Replacer {
    focus: Arc<dyn FocusedText>,
    clipboard: Arc<dyn SystemClipboard>,
    clock: Arc<dyn Clock>,
    config: ReplacementConfig,
    /// Apps whose direct write failed during this session.
    write_failures: Mutex<HashSet<String>>,
}

impl Replacer {
    /// Create a replacer.
    pub fn new(
        focus: Arc<dyn FocusedText>,
        clipboard: Arc<dyn SystemClipboard>,
        clock: Arc<dyn Clock>,
        config: ReplacementConfig,
    ) -> Self {
        Self {
            focus,
            clipboard,
            clock,
            config,
            write_failures: Mutex::new(HashSet::new()),
        }
    }

    /// Whether a direct write should be attempted for `app`.
    #[must_use]
    pub fn direct_write_allowed(&self, app: Option<&str>) -> bool {
        let Some(app) = app else {
            return true;
        };
        if self.config.is_write_blocked(app) {
            return false;
        }
        !self
            .write_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(app)
    }

    fn remember_write_failure(&self, app: Option<&str>) {
        if let Some(app) = app {
            let inserted = self
                .write_failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(app.to_string());
            if inserted {
                info!(app, "Direct write failed, using paste for the rest of the session");
            }
        }
    }

    /// Replace the selection with `text`.
    ///
    /// A direct write is only attempted when the selection was read
    /// directly. The lease from acquisition, if any, is restored after a
    /// paste, or on drop when the paste could not be performed.
    pub async fn replace(
        &self,
        text: &str,
        app: Option<&str>,
        acquired_via_fallback: bool,
        lease: Option<ClipboardLease>,
    ) -> ReplacementOutcome {
        if !acquired_via_fallback && self.direct_write_allowed(app) {
            match self.focus.write_selection(text) {
                Ok(()) => {
                    debug!(len = text.len(), "Replaced selection directly");
                    return ReplacementOutcome::new(ReplacementMethod::DirectWrite, true);
                }
                Err(e) => {
                    debug!(error = %e, "Direct write failed, falling back to paste");
                    self.remember_write_failure(app);
                }
            }
        }

        self.paste(text, lease).await
    }

    async fn paste(&self, text: &str, lease: Option<ClipboardLease>) -> ReplacementOutcome {
        if let Err(e) = self.clipboard.write(text) {
            warn!(error = %e, "Failed to put result on the clipboard");
            return ReplacementOutcome::new(ReplacementMethod::ClipboardPaste, false);
        }

        self.clock.sleep(self.config.paste_settle_delay()).await;

        if let Err(e) = self.clipboard.synthesize_paste() {
            warn!(error = %e, "Failed to paste result");
            return ReplacementOutcome::new(ReplacementMethod::ClipboardPaste, false);
        }
        debug!(len = text.len(), "Replaced selection via paste");

        if let Some(lease) = lease {
            // The target app reads the clipboard asynchronously after the
            // shortcut; restoring too early would paste the old content.
            self.clock.sleep(self.config.restore_delay()).await;
            if let Err(e) = lease.restore() {
                warn!(error = %e, "Failed to restore clipboard");
            }
        }

        ReplacementOutcome::new(ReplacementMethod::ClipboardPaste, true)
    }

    /// Leave `text` on the clipboard for the user to paste.
    ///
    /// On success the lease is disarmed so the result stays put; on failure
    /// it restores the user's clipboard.
    pub fn deliver_to_clipboard(
        &self,
        text: &str,
        lease: Option<ClipboardLease>,
    ) -> ReplacementOutcome {
        match self.clipboard.write(text) {
            Ok(()) => {
                if let Some(lease) = lease {
                    lease.disarm();
                }
                debug!(len = text.len(), "Left result on the clipboard");
                ReplacementOutcome::new(ReplacementMethod::ClipboardCopy, true)
            }
            Err(e) => {
                warn!(error = %e, "Failed to put result on the clipboard");
                ReplacementOutcome::new(ReplacementMethod::ClipboardCopy, false)
            }
        }
    }
}

impl fmt::Debug for Replacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Replacer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{ClipboardCall, FakeClipboard, FakeFocus, ManualClock};

    fn replacer(focus: &Arc<FakeFocus>, clipboard: &Arc<FakeClipboard>) -> (Replacer, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let config = ReplacementConfig {
            direct_write_blocklist: vec!["Slack".to_string()],
            ..ReplacementConfig::default()
        };
        let replacer = Replacer::new(focus.clone(), clipboard.clone(), clock.clone(), config);
        (replacer, clock)
    }

    #[tokio::test]
    async fn test_direct_write_when_read_directly() {
        let focus = Arc::new(FakeFocus::with_selection("teh"));
        let clipboard = Arc::new(FakeClipboard::new());
        let (replacer, _) = replacer(&focus, &clipboard);

        let outcome = replacer.replace("the", Some("Notes"), false, None).await;

        assert_eq!(outcome, ReplacementOutcome::new(ReplacementMethod::DirectWrite, true));
        assert_eq!(focus.writes(), vec!["the"]);
        assert!(clipboard.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_acquisition_skips_direct_write() {
        let focus = Arc::new(FakeFocus::with_selection("teh"));
        let clipboard = Arc::new(FakeClipboard::new());
        let (replacer, _) = replacer(&focus, &clipboard);

        let outcome = replacer.replace("the", Some("Notes"), true, None).await;

        assert_eq!(outcome.method, ReplacementMethod::ClipboardPaste);
        assert!(outcome.succeeded);
        assert!(focus.writes().is_empty());
        assert!(clipboard.calls().contains(&ClipboardCall::Paste));
    }

    #[tokio::test]
    async fn test_blocklisted_app_uses_paste() {
        let focus = Arc::new(FakeFocus::with_selection("teh"));
        let clipboard = Arc::new(FakeClipboard::new());
        let (replacer, _) = replacer(&focus, &clipboard);

        let outcome = replacer.replace("the", Some("Slack"), false, None).await;

        assert_eq!(outcome.method, ReplacementMethod::ClipboardPaste);
        assert!(focus.writes().is_empty());
    }

    #[tokio::test]
    async fn test_failed_direct_write_falls_back_and_is_remembered() {
        let focus = Arc::new(FakeFocus::with_selection("teh").rejecting_writes());
        let clipboard = Arc::new(FakeClipboard::new());
        let (replacer, _) = replacer(&focus, &clipboard);

        assert!(replacer.direct_write_allowed(Some("Pages")));
        let outcome = replacer.replace("the", Some("Pages"), false, None).await;

        assert_eq!(outcome, ReplacementOutcome::new(ReplacementMethod::ClipboardPaste, true));
        assert_eq!(clipboard.content().as_deref(), Some("the"));
        assert!(!replacer.direct_write_allowed(Some("Pages")));
        assert!(replacer.direct_write_allowed(Some("TextEdit")));
    }

    #[tokio::test]
    async fn test_paste_waits_then_restores_lease() {
        let focus = Arc::new(FakeFocus::unavailable());
        let clipboard = Arc::new(FakeClipboard::new().with_content("user data"));
        let (replacer, clock) = replacer(&focus, &clipboard);

        let lease = ClipboardLease::take(clipboard.clone()).unwrap();
        let outcome = replacer.replace("result", None, true, Some(lease)).await;

        assert!(outcome.succeeded);
        assert_eq!(clipboard.content().as_deref(), Some("user data"));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(60), Duration::from_millis(250)]
        );
        let calls = clipboard.calls();
        let paste = calls.iter().position(|c| *c == ClipboardCall::Paste).unwrap();
        let restore = calls
            .iter()
            .rposition(|c| *c == ClipboardCall::Write("user data".to_string()))
            .unwrap();
        assert!(paste < restore);
    }

    #[tokio::test]
    async fn test_failed_paste_is_reported_and_lease_restored() {
        let focus = Arc::new(FakeFocus::unavailable());
        let clipboard = Arc::new(FakeClipboard::new().with_content("keep").failing_paste());
        let (replacer, _) = replacer(&focus, &clipboard);

        let lease = ClipboardLease::take(clipboard.clone()).unwrap();
        let outcome = replacer.replace("result", None, true, Some(lease)).await;

        assert_eq!(outcome, ReplacementOutcome::new(ReplacementMethod::ClipboardPaste, false));
        assert_eq!(clipboard.content().as_deref(), Some("keep"));
    }

    #[test]
    fn test_deliver_to_clipboard_keeps_result() {
        let focus = Arc::new(FakeFocus::unavailable());
        let clipboard = Arc::new(FakeClipboard::new().with_content("before"));
        let (replacer, _) = replacer(&focus, &clipboard);

        let lease = ClipboardLease::take(clipboard.clone()).unwrap();
        let outcome = replacer.deliver_to_clipboard("Hallo", Some(lease));

        assert_eq!(outcome, ReplacementOutcome::new(ReplacementMethod::ClipboardCopy, true));
        assert_eq!(clipboard.content().as_deref(), Some("Hallo"));
        assert!(!clipboard.calls().contains(&ClipboardCall::Paste));
    }

    #[test]
    fn test_lease_restores_on_drop() {
        let clipboard = Arc::new(FakeClipboard::new().with_content("original"));
        {
            let _lease = ClipboardLease::take(clipboard.clone()).unwrap();
            clipboard.write("temporary").unwrap();
        }
        assert_eq!(clipboard.content().as_deref(), Some("original"));
    }

    #[test]
    fn test_lease_restores_empty_clipboard() {
        let clipboard = Arc::new(FakeClipboard::new());
        let lease = ClipboardLease::take(clipboard.clone()).unwrap();
        clipboard.write("temporary").unwrap();
        lease.restore().unwrap();
        assert_eq!(clipboard.content(), None);
    }

    #[test]
    fn test_disarmed_lease_leaves_clipboard() {
        let clipboard = Arc::new(FakeClipboard::new().with_content("original"));
        let lease = ClipboardLease::take(clipboard.clone()).unwrap();
        clipboard.write("result").unwrap();
        lease.disarm();
        assert_eq!(clipboard.content().as_deref(), Some("result"));
    }

    #[test]
    fn test_method_display() {
        assert_eq!(ReplacementMethod::DirectWrite.to_string(), "direct write");
        assert_eq!(ReplacementMethod::ClipboardPaste.to_string(), "clipboard paste");
        assert_eq!(ReplacementMethod::ClipboardCopy.to_string(), "clipboard copy");
    }
}
