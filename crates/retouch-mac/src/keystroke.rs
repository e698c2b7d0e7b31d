//! Keyboard shortcut synthesis through System Events.

use thiserror::Error;
use tracing::trace;

use crate::script;

/// Errors from synthesizing a shortcut.
#[derive(Debug, Error)]
#[error("failed to send {shortcut}: {message}")]
pub struct KeystrokeError {
    /// The shortcut that failed.
    pub shortcut: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

fn send(shortcut: &'static str, key_command: &str) -> Result<(), KeystrokeError> {
    let script = format!("tell application \"System Events\" to {key_command}");
    script::run(&script, &[]).map_err(|e| KeystrokeError {
        shortcut,
        message: e.to_string(),
    })?;
    trace!(shortcut, "Sent keyboard shortcut");
    Ok(())
}

/// Send Cmd+C to the frontmost application.
///
/// # Errors
///
/// Returns an error if System Events rejects the keystroke.
pub fn send_copy() -> Result<(), KeystrokeError> {
    send("Cmd+C", "keystroke \"c\" using command down")
}

/// Send Cmd+V to the frontmost application.
///
/// # Errors
///
/// Returns an error if System Events rejects the keystroke.
pub fn send_paste() -> Result<(), KeystrokeError> {
    send("Cmd+V", "keystroke \"v\" using command down")
}
