//! Linux-specific implementation for retouch.
//!
//! Linux has no portable API for reading the selection inside another
//! application, so acquisition here always goes through the clipboard with
//! synthetic shortcuts sent by `xdotool`.

#![cfg(target_os = "linux")]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod clipboard;
mod command;
pub mod keystroke;
pub mod notification;
pub mod window;

pub use clipboard::{ChangeTracker, ClipboardError, DesktopClipboard};
pub use command::CommandError;
pub use keystroke::{send_copy, send_paste};
pub use window::active_window_class;

/// Initialize Linux-specific components.
///
/// # Errors
///
/// Returns an error if initialization fails.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Initializing Linux platform components");
    Ok(())
}

/// Get platform name.
#[must_use]
pub fn platform_name() -> &'static str {
    "Linux"
}
