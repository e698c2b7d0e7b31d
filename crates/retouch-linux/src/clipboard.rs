//! Clipboard access for Linux desktops.
//!
//! X11 and Wayland clipboards have no portable change counter, so one is
//! derived from a content hash that is bumped whenever an observation differs
//! from the previous one.

use std::sync::{Mutex, PoisonError};

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
    last_hash: Option<blake3::Hash>,
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
        let hash = blake3::hash(content.unwrap_or_default().as_bytes());
        match self.last_hash.replace(hash) {
            Some(previous) if previous != hash => self.count += 1,
            Some(_) => trace!("Clipboard content unchanged"),
            None => {}
        }
        self.count
    }
}

/// Plain-text access to the desktop clipboard.
#[derive(Debug, Default)]
pub struct DesktopClipboard {
    tracker: Mutex<ChangeTracker>,
}

impl DesktopClipboard {
    /// Create a new clipboard handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn context() -> Result<ClipboardContext> {
        ClipboardContext::new().map_err(|e| ClipboardError::AccessFailed(e.to_string()))
    }

    /// Current clipboard text, `None` when empty or not text.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be opened.
    pub fn get_text(&self) -> Result<Option<String>> {
        let ctx = Self::context()?;
        Ok(ctx.get_text().ok().filter(|text| !text.is_empty()))
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
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observe(text.as_deref())
    }
}
