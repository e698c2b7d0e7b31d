//! Platform-agnostic access to the focused element and the clipboard.
//!
//! This module defines the traits the operation pipeline drives and the
//! error types they report. The native implementations live in the
//! platform crates and are adapted here behind `cfg(target_os)`.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::error::Result;
use crate::notify::Notifier;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;

/// Why the focused element's selection could not be read directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionReadError {
    /// A text element is focused but nothing is selected.
    #[error("no text selected")]
    NoSelection,

    /// The focused element is a password field.
    #[error("focused field is a secure text field")]
    SecureField,

    /// The focused element does not expose its selection.
    #[error("selection unavailable: {0}")]
    Unavailable(String),
}

/// The focused element refused a direct write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("direct write failed: {0}")]
pub struct WriteFailed(pub String);

/// Errors from clipboard access and shortcut synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardError {
    /// The clipboard could not be read or written.
    #[error("clipboard access failed: {0}")]
    AccessFailed(String),

    /// A copy or paste shortcut could not be sent.
    #[error("keystroke failed: {0}")]
    KeystrokeFailed(String),
}

/// Clipboard text captured before the pipeline takes it over.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SavedClipboard(pub Option<String>);

/// The selection of the focused element in the frontmost application.
pub trait FocusedText: Send + Sync {
    /// Read the current selection exactly as the application reports it.
    ///
    /// # Errors
    ///
    /// Returns why a direct read is not possible.
    fn read_selection(&self) -> std::result::Result<String, SelectionReadError>;

    /// Replace the current selection with `text`.
    ///
    /// # Errors
    ///
    /// Returns [`WriteFailed`] if the element rejects the write.
    fn write_selection(&self, text: &str) -> std::result::Result<(), WriteFailed>;

    /// Name of the frontmost application, if known.
    fn active_app(&self) -> Option<String>;
}

/// The system clipboard plus synthetic copy/paste shortcuts.
pub trait SystemClipboard: Send + Sync {
    /// Current plain-text content, `None` when empty or not text.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be accessed.
    fn read(&self) -> std::result::Result<Option<String>, ClipboardError>;

    /// Replace the clipboard content with `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be accessed.
    fn write(&self, text: &str) -> std::result::Result<(), ClipboardError>;

    /// Empty the clipboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be accessed.
    fn clear(&self) -> std::result::Result<(), ClipboardError>;

    /// Counter that changes whenever the clipboard content changes.
    fn change_count(&self) -> u64;

    /// Send the platform copy shortcut to the frontmost application.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardError::KeystrokeFailed`] if it cannot be sent.
    fn synthesize_copy(&self) -> std::result::Result<(), ClipboardError>;

    /// Send the platform paste shortcut to the frontmost application.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardError::KeystrokeFailed`] if it cannot be sent.
    fn synthesize_paste(&self) -> std::result::Result<(), ClipboardError>;

    /// Snapshot the current content.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be read.
    fn save(&self) -> std::result::Result<SavedClipboard, ClipboardError> {
        self.read().map(SavedClipboard)
    }

    /// Put a snapshot back.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be written.
    fn restore(&self, saved: &SavedClipboard) -> std::result::Result<(), ClipboardError> {
        match &saved.0 {
            Some(text) => self.write(text),
            None => self.clear(),
        }
    }
}

/// Readiness of the native platform layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformStatus {
    /// Platform name.
    pub name: &'static str,

    /// Whether the permissions needed for shortcuts and direct access are granted.
    pub has_permission: bool,

    /// Human-readable status message.
    pub message: String,

    /// How to grant missing permissions, when any are missing.
    pub instructions: Option<String>,
}

impl fmt::Display for PlatformStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.message)
    }
}

/// Native collaborators for the operation pipeline.
#[derive(Clone)]
pub struct PlatformServices {
    /// Platform name.
    pub name: &'static str,
    /// Focused-element access.
    pub focus: Arc<dyn FocusedText>,
    /// Clipboard and shortcut access.
    pub clipboard: Arc<dyn SystemClipboard>,
    /// User notifications.
    pub notifier: Arc<dyn Notifier>,
}

impl fmt::Debug for PlatformServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformServices")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Build the native collaborators for the current OS.
///
/// # Errors
///
/// Returns an error on unsupported platforms or if initialization fails.
pub fn native() -> Result<PlatformServices> {
    #[cfg(target_os = "macos")]
    {
        macos::services()
    }
    #[cfg(target_os = "linux")]
    {
        linux::services()
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        Err(crate::Error::platform(
            "this operating system is not supported",
        ))
    }
}

/// Report whether the native layer is usable.
#[must_use]
pub fn status() -> PlatformStatus {
    #[cfg(target_os = "macos")]
    {
        macos::status()
    }
    #[cfg(target_os = "linux")]
    {
        linux::status()
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        PlatformStatus {
            name: "unsupported",
            has_permission: false,
            message: "no native integration for this operating system".to_string(),
            instructions: None,
        }
    }
}

#[cfg(any(target_os = "macos", target_os = "linux"))]
fn init_error(e: &dyn std::error::Error) -> crate::Error {
    crate::Error::platform(format!("failed to initialize platform: {e}"))
}
