//! macOS-specific implementation for retouch.
//!
//! This crate provides the macOS side of text acquisition and replacement:
//! selection access via accessibility, the pasteboard, synthetic copy/paste
//! shortcuts and notification banners.

#![cfg(target_os = "macos")]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod accessibility;
pub mod clipboard;
pub mod keystroke;
pub mod notification;
pub mod permissions;
mod script;

pub use accessibility::{
    frontmost_app_name, AccessibilityBridge, AccessibilityError, SelectionRead,
};
pub use clipboard::{ChangeTracker, ClipboardError, PasteboardBridge};
pub use keystroke::{send_copy, send_paste, KeystrokeError};
pub use permissions::{
    check_permission, get_permission_instructions, is_accessibility_enabled,
    request_accessibility_permission, PermissionStatus,
};
pub use script::ScriptError;

/// Initialize macOS-specific components.
///
/// Logs a warning when accessibility permission is missing; the clipboard
/// path still works for reading, but synthetic shortcuts will be refused.
///
/// # Errors
///
/// Returns an error if initialization fails.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Initializing macOS platform components");
    if !is_accessibility_enabled() {
        tracing::warn!("Accessibility permission is not granted");
    }
    Ok(())
}

/// Get the platform name.
#[must_use]
pub fn platform_name() -> &'static str {
    "macOS"
}
