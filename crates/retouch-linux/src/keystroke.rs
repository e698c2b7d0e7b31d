//! Copy and paste shortcut synthesis via `xdotool`.

use tracing::trace;

use crate::command::{self, CommandError};

fn send(keys: &str) -> Result<(), CommandError> {
    command::run("xdotool", &["key", "--clearmodifiers", keys])?;
    trace!(keys, "Sent keyboard shortcut");
    Ok(())
}

/// Send Ctrl+C to the focused window.
///
/// # Errors
///
/// Returns an error if `xdotool` is missing or fails.
pub fn send_copy() -> Result<(), CommandError> {
    send("ctrl+c")
}

/// Send Ctrl+V to the focused window.
///
/// # Errors
///
/// Returns an error if `xdotool` is missing or fails.
pub fn send_paste() -> Result<(), CommandError> {
    send("ctrl+v")
}
