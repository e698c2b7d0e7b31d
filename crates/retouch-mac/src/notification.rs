//! User notifications through Notification Center.

use tracing::warn;

use crate::script;

const NOTIFY_SCRIPT: &str = r"
on run argv
    display notification (item 2 of argv) with title (item 1 of argv)
end run
";

/// Show a notification banner. Failures are logged and otherwise ignored.
pub fn show(title: &str, body: &str) {
    if let Err(e) = script::run(NOTIFY_SCRIPT, &[title, body]) {
        warn!(error = %e, "Failed to display notification");
    }
}
