//! Desktop notifications via `notify-send`.

use tracing::warn;

use crate::command;

/// Show a notification. Failures are logged and otherwise ignored.
pub fn show(title: &str, body: &str) {
    if let Err(e) = command::run("notify-send", &["--app-name=retouch", title, body]) {
        warn!(error = %e, "Failed to display notification");
    }
}
