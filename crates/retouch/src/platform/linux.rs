//! Linux adapters over `retouch-linux`.
//!
//! There is no portable way to reach another application's selection, so
//! the focused element always reports `Unavailable` and every operation
//! goes through the clipboard.

use std::sync::Arc;

use retouch_linux::DesktopClipboard;

use super::{
    init_error, ClipboardError, FocusedText, PlatformServices, PlatformStatus,
    SelectionReadError, SystemClipboard, WriteFailed,
};
use crate::error::Result;
use crate::notify::NativeNotifier;

/// Focused window lookup without selection access.
#[derive(Debug, Default)]
pub struct LinuxFocusedText;

impl FocusedText for LinuxFocusedText {
    fn read_selection(&self) -> std::result::Result<String, SelectionReadError> {
        Err(SelectionReadError::Unavailable(
            "direct selection access is not supported on Linux".to_string(),
        ))
    }

    fn write_selection(&self, _text: &str) -> std::result::Result<(), WriteFailed> {
        Err(WriteFailed(
            "direct selection access is not supported on Linux".to_string(),
        ))
    }

    fn active_app(&self) -> Option<String> {
        retouch_linux::active_window_class()
    }
}

/// Desktop clipboard plus Ctrl+C / Ctrl+V through `xdotool`.
#[derive(Debug, Default)]
pub struct LinuxClipboard {
    clipboard: DesktopClipboard,
}

fn access(e: retouch_linux::ClipboardError) -> ClipboardError {
    ClipboardError::AccessFailed(e.to_string())
}

impl SystemClipboard for LinuxClipboard {
    fn read(&self) -> std::result::Result<Option<String>, ClipboardError> {
        self.clipboard.get_text().map_err(access)
    }

    fn write(&self, text: &str) -> std::result::Result<(), ClipboardError> {
        self.clipboard.set_text(text).map_err(access)
    }

    fn clear(&self) -> std::result::Result<(), ClipboardError> {
        self.clipboard.clear().map_err(access)
    }

    fn change_count(&self) -> u64 {
        self.clipboard.change_count()
    }

    fn synthesize_copy(&self) -> std::result::Result<(), ClipboardError> {
        retouch_linux::send_copy().map_err(|e| ClipboardError::KeystrokeFailed(e.to_string()))
    }

    fn synthesize_paste(&self) -> std::result::Result<(), ClipboardError> {
        retouch_linux::send_paste().map_err(|e| ClipboardError::KeystrokeFailed(e.to_string()))
    }
}

pub(super) fn services() -> Result<PlatformServices> {
    retouch_linux::init().map_err(|e| init_error(e.as_ref()))?;

    Ok(PlatformServices {
        name: retouch_linux::platform_name(),
        focus: Arc::new(LinuxFocusedText),
        clipboard: Arc::new(LinuxClipboard::default()),
        notifier: Arc::new(NativeNotifier::new(retouch_linux::notification::show)),
    })
}

pub(super) fn status() -> PlatformStatus {
    PlatformStatus {
        name: retouch_linux::platform_name(),
        has_permission: true,
        message: "clipboard path only; requires xdotool and notify-send".to_string(),
        instructions: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focused_text_is_unavailable() {
        let focus = LinuxFocusedText;
        assert!(matches!(
            focus.read_selection(),
            Err(SelectionReadError::Unavailable(_))
        ));
        assert!(focus.write_selection("x").is_err());
    }
}
