//! `osascript` runner shared by the accessibility, keystroke and
//! notification bridges.

use std::process::Command;

use thiserror::Error;
use tracing::trace;

/// Errors from running an `AppleScript` snippet.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// `osascript` could not be launched.
    #[error("failed to launch osascript: {0}")]
    Launch(String),

    /// The script ran and reported an error.
    #[error("AppleScript failed: {0}")]
    Failed(String),
}

/// Run `script` with `args` bound to `argv` and return its stdout.
///
/// Only the single trailing newline `osascript` appends is removed; the rest
/// of the output is returned untouched.
///
/// # Errors
///
/// Returns an error if `osascript` cannot be launched or exits non-zero.
pub fn run(script: &str, args: &[&str]) -> Result<String, ScriptError> {
    let output = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .args(args)
        .output()
        .map_err(|e| ScriptError::Launch(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        trace!(%stderr, "osascript returned non-zero exit code");
        return Err(ScriptError::Failed(stderr));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    Ok(strip_trailing_newline(stdout))
}

/// Drop the single `\n` osascript appends to its result.
pub(crate) fn strip_trailing_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
    }
    text
}
