//! Helper for running desktop utilities.

use std::process::Command;

use thiserror::Error;

/// Errors from running an external desktop utility.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started (usually not installed).
    #[error("failed to launch {program}: {message}")]
    Launch {
        /// Program name.
        program: &'static str,
        /// Launch error.
        message: String,
    },

    /// The program ran and reported failure.
    #[error("{program} failed: {message}")]
    Failed {
        /// Program name.
        program: &'static str,
        /// Trimmed stderr.
        message: String,
    },
}

/// Run `program` with `args` and return trimmed stdout.
pub(crate) fn run(program: &'static str, args: &[&str]) -> Result<String, CommandError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| CommandError::Launch {
            program,
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            program,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
