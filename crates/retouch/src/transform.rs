//! Text transformation backends.
//!
//! The pipeline treats the language model as an opaque async function from
//! masked text to text. [`CommandTransformer`] implements it by running a
//! local program: the masked text goes to stdin and the result is read from
//! stdout.

use std::fmt;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::TransformerConfig;
use crate::masking::{TOKEN_PREFIX, TOKEN_SUFFIX};
use crate::operation::OperationKind;

/// Exit code for missing or rejected credentials.
pub const EXIT_NO_CREDENTIALS: i32 = 77;

/// Exit code for input the backend refuses as too long.
pub const EXIT_TEXT_TOO_LONG: i32 = 65;

/// Exit code for rate limiting.
pub const EXIT_RATE_LIMITED: i32 = 75;

/// Failures reported by a transformer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// No transformer is configured.
    #[error("no transformer configured")]
    NotConfigured,

    /// The backend has no usable credentials.
    #[error("the transformer has no valid credentials")]
    NoCredentials,

    /// The backend refused the text as too long.
    #[error("the text is too long for the transformer")]
    TextTooLong,

    /// The backend is rate limiting requests.
    #[error("the transformer is rate limited, try again later")]
    RateLimited,

    /// The request did not finish in time.
    #[error("the transformer did not respond in time")]
    Timeout,

    /// The backend reported an error.
    #[error("the transformer failed: {0}")]
    ServerError(String),

    /// The backend could not be reached or started.
    #[error("could not reach the transformer: {0}")]
    Connection(String),

    /// The backend returned nothing.
    #[error("the transformer returned an empty response")]
    EmptyResponse,
}

/// Per-request instructions for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    /// Target language for translations.
    pub target_language: String,
    /// Natural-language instruction for the model.
    pub instruction: String,
}

impl PromptConfig {
    /// Build the instruction for `kind`.
    #[must_use]
    pub fn for_kind(kind: OperationKind, target_language: &str) -> Self {
        let task = match kind {
            OperationKind::Correction => {
                "Correct the spelling and grammar of the text without changing its meaning or language."
                    .to_string()
            }
            OperationKind::Translation => {
                format!("Translate the text into {target_language}.")
            }
        };
        let instruction = format!(
            "{task} Placeholders of the form {TOKEN_PREFIX}<number>{TOKEN_SUFFIX} must be kept exactly as written. Reply with the resulting text only."
        );
        Self {
            target_language: target_language.to_string(),
            instruction,
        }
    }
}

/// Turns masked text into corrected or translated text.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Whether a backend is set up at all.
    fn is_configured(&self) -> bool;

    /// Transform `text`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] describing why no text was produced.
    async fn transform(
        &self,
        kind: OperationKind,
        text: &str,
        prompt: &PromptConfig,
    ) -> Result<String, TransformError>;
}

/// Runs a local program per request.
///
/// The program receives the masked text on stdin and these environment
/// variables: `RETOUCH_OPERATION`, `RETOUCH_TARGET_LANGUAGE`,
/// `RETOUCH_PROMPT` and `RETOUCH_TOKEN_FORMAT`. Occurrences of `{prompt}`
/// and `{language}` in the configured arguments are substituted.
///
/// The child is killed if the returned future is dropped, so wrapping the
/// call in `tokio::time::timeout` bounds it.
#[derive(Clone, Default)]
pub struct CommandTransformer {
    command: Option<String>,
    args: Vec<String>,
}

impl CommandTransformer {
    /// Create a transformer for `command` with `args`.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: Some(command.into()),
            args,
        }
    }

    /// Create a transformer from configuration.
    #[must_use]
    pub fn from_config(config: &TransformerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    fn expand_args(&self, prompt: &PromptConfig) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{prompt}", &prompt.instruction)
                    .replace("{language}", &prompt.target_language)
            })
            .collect()
    }
}

impl fmt::Debug for CommandTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTransformer")
            .field("command", &self.command)
            .field("args", &self.args.len())
            .finish()
    }
}

#[async_trait]
impl Transformer for CommandTransformer {
    fn is_configured(&self) -> bool {
        self.command.is_some()
    }

    async fn transform(
        &self,
        kind: OperationKind,
        text: &str,
        prompt: &PromptConfig,
    ) -> Result<String, TransformError> {
        let program = self.command.as_deref().ok_or(TransformError::NotConfigured)?;

        let mut child = Command::new(program)
            .args(self.expand_args(prompt))
            .env("RETOUCH_OPERATION", kind.as_str())
            .env("RETOUCH_TARGET_LANGUAGE", &prompt.target_language)
            .env("RETOUCH_PROMPT", &prompt.instruction)
            .env(
                "RETOUCH_TOKEN_FORMAT",
                format!("{TOKEN_PREFIX}<n>{TOKEN_SUFFIX}"),
            )
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TransformError::Connection(format!("failed to start {program}: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransformError::Connection("stdin not available".to_string()))?;
        let input = text.to_string();
        // Write concurrently with reading stdout so large texts cannot
        // deadlock on full pipes.
        let writer = tokio::spawn(async move {
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                warn!(error = %e, "Failed to write text to transformer");
            }
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| TransformError::Connection(e.to_string()))?;
        let _ = writer.await;

        debug!(
            status = %output.status,
            stdout_len = output.stdout.len(),
            "Transformer exited"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(map_exit_status(output.status, stderr));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| {
            TransformError::ServerError("response was not valid UTF-8".to_string())
        })?;
        let result = strip_line_ending(stdout);
        if result.trim().is_empty() {
            return Err(TransformError::EmptyResponse);
        }
        Ok(result)
    }
}

fn map_exit_status(status: ExitStatus, stderr: String) -> TransformError {
    match status.code() {
        Some(EXIT_NO_CREDENTIALS) => TransformError::NoCredentials,
        Some(EXIT_TEXT_TOO_LONG) => TransformError::TextTooLong,
        Some(EXIT_RATE_LIMITED) => TransformError::RateLimited,
        Some(code) if stderr.is_empty() => {
            TransformError::ServerError(format!("exited with status {code}"))
        }
        Some(_) => TransformError::ServerError(stderr),
        None => TransformError::ServerError("terminated by signal".to_string()),
    }
}

/// Drop the single line ending most CLIs append to their output.
fn strip_line_ending(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}
