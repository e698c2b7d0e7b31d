//! Clipboard access for macOS.
//!
//! Reads and writes plain text on the general pasteboard and exposes a change
//! counter. The counter is derived from a content hash: every observation
//! that sees different content than the previous one bumps it.

use std::sync::Mutex;

use clipboard_rs::{Clipboard, ClipboardContext};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors that can occur during clipboard access.
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// Failed to access the clipboard.
    #[error("clipboard access failed: {0}")]
    AccessFailed(String),
}

/// Result type for clipboard operations.
pub type Result<T> = std::result::Result<T, ClipboardError>;

/// Hash-based change counter.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    last_hash: Option<String>,
    count: u64,
}

impl ChangeTracker {
    /// Create a tracker that has not observed anything yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current content and return the counter.
    pub fn observe(&mut self, content: Option<&str>) -> u64 {
        let hash = blake3::hash(content.unwrap_or_default().as_bytes())
            .to_hex()
            .to_string();

        match &self.last_hash {
            Some(last) if *last == hash => {
                trace!("Clipboard content unchanged");
            }
            Some(_) => {
                self.count += 1;
                self.last_hash = Some(hash);
            }
            None => self.last_hash = Some(hash),
        }
        self.count
    }
}

/// Plain-text access to the system pasteboard.
#[derive(Debug, Default)]
pub struct PasteboardBridge {
    tracker: Mutex<ChangeTracker>,
}

impl PasteboardBridge {
    /// Create a new pasteboard bridge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn context() -> Result<ClipboardContext> {
        ClipboardContext::new().map_err(|e| ClipboardError::AccessFailed(e.to_string()))
    }

    /// Get the current clipboard text content.
    ///
    /// # Errors
    ///
    /// Returns an error if clipboard access fails.
    pub fn get_text(&self) -> Result<Option<String>> {
        let ctx = Self::context()?;

        match ctx.get_text() {
            Ok(text) if !text.is_empty() => Ok(Some(text)),
            // No text content or non-text clipboard is not an error
            Ok(_) | Err(_) => Ok(None),
        }
    }

    /// Replace the clipboard content with `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if clipboard access fails.
    pub fn set_text(&self, text: &str) -> Result<()> {
        let ctx = Self::context()?;
        ctx.set_text(text.to_string())
            .map_err(|e| ClipboardError::AccessFailed(e.to_string()))?;
        debug!(len = text.len(), "Wrote clipboard text");
        Ok(())
    }

    /// Empty the clipboard.
    ///
    /// # Errors
    ///
    /// Returns an error if clipboard access fails.
    pub fn clear(&self) -> Result<()> {
        let ctx = Self::context()?;
        ctx.clear()
            .map_err(|e| ClipboardError::AccessFailed(e.to_string()))
    }

    /// Current value of the change counter.
    #[must_use]
    pub fn change_count(&self) -> u64 {
        let text = self.get_text().ok().flatten();
        let mut tracker = self
            .tracker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        tracker.observe(text.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_first_observation_does_not_count() {
        let mut tracker = ChangeTracker::new();
        assert_eq!(tracker.observe(Some("a")), 0);
    }

    #[test]
    fn test_tracker_counts_changes() {
        let mut tracker = ChangeTracker::new();
        tracker.observe(None);
        assert_eq!(tracker.observe(None), 0);
        assert_eq!(tracker.observe(Some("copied")), 1);
        assert_eq!(tracker.observe(Some("copied")), 1);
        assert_eq!(tracker.observe(Some("other")), 2);
    }

    #[test]
    fn test_clipboard_error_display() {
        let error = ClipboardError::AccessFailed("test error".to_string());
        assert_eq!(error.to_string(), "clipboard access failed: test error");
    }

    #[test]
    fn test_bridge_debug() {
        let bridge = PasteboardBridge::new();
        assert!(format!("{bridge:?}").contains("PasteboardBridge"));
    }

    // Integration tests that require actual clipboard access.
    // Run with: cargo test --ignored

    #[test]
    #[ignore = "requires clipboard access, may segfault in CI"]
    fn test_set_and_get_text() {
        let bridge = PasteboardBridge::new();
        bridge.set_text("retouch clipboard test").unwrap();
        assert_eq!(
            bridge.get_text().unwrap(),
            Some("retouch clipboard test".to_string())
        );
    }
}
