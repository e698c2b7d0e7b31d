//! Focused window lookup.

use crate::command;

/// Class name of the focused window, if it can be determined.
#[must_use]
pub fn active_window_class() -> Option<String> {
    command::run("xdotool", &["getactivewindow", "getwindowclassname"])
        .ok()
        .filter(|name| !name.is_empty())
}
