//! macOS adapters over `retouch-mac`.

use std::sync::Arc;

use retouch_mac::{AccessibilityBridge, PasteboardBridge, SelectionRead};
use tracing::{debug, warn};

use super::{
    init_error, ClipboardError, FocusedText, PlatformServices, PlatformStatus,
    SelectionReadError, SystemClipboard, WriteFailed,
};
use crate::error::Result;
use crate::notify::NativeNotifier;

/// Focused element via System Events.
#[derive(Debug, Default)]
pub struct MacFocusedText {
    bridge: AccessibilityBridge,
}

impl FocusedText for MacFocusedText {
    fn read_selection(&self) -> std::result::Result<String, SelectionReadError> {
        match self.bridge.read_selection() {
            SelectionRead::Text(text) => Ok(text),
            SelectionRead::Empty => Err(SelectionReadError::NoSelection),
            SelectionRead::Secure => Err(SelectionReadError::SecureField),
            SelectionRead::Unavailable(reason) => Err(SelectionReadError::Unavailable(reason)),
        }
    }

    fn write_selection(&self, text: &str) -> std::result::Result<(), WriteFailed> {
        self.bridge
            .write_selection(text)
            .map_err(|e| WriteFailed(e.to_string()))
    }

    fn active_app(&self) -> Option<String> {
        retouch_mac::frontmost_app_name()
    }
}

/// General pasteboard plus Cmd+C / Cmd+V.
#[derive(Debug, Default)]
pub struct MacClipboard {
    pasteboard: PasteboardBridge,
}

fn access(e: retouch_mac::ClipboardError) -> ClipboardError {
    ClipboardError::AccessFailed(e.to_string())
}

impl SystemClipboard for MacClipboard {
    fn read(&self) -> std::result::Result<Option<String>, ClipboardError> {
        self.pasteboard.get_text().map_err(access)
    }

    fn write(&self, text: &str) -> std::result::Result<(), ClipboardError> {
        self.pasteboard.set_text(text).map_err(access)
    }

    fn clear(&self) -> std::result::Result<(), ClipboardError> {
        self.pasteboard.clear().map_err(access)
    }

    fn change_count(&self) -> u64 {
        self.pasteboard.change_count()
    }

    fn synthesize_copy(&self) -> std::result::Result<(), ClipboardError> {
        retouch_mac::send_copy().map_err(|e| ClipboardError::KeystrokeFailed(e.to_string()))
    }

    fn synthesize_paste(&self) -> std::result::Result<(), ClipboardError> {
        retouch_mac::send_paste().map_err(|e| ClipboardError::KeystrokeFailed(e.to_string()))
    }
}

/// Show the system accessibility prompt if the process is not trusted yet.
///
/// Returns whether the process is trusted. Operations still run when it is
/// not and report their own failures.
fn prompt_if_untrusted(trusted: bool, request: impl FnOnce() -> bool) -> bool {
    if trusted {
        return true;
    }
    let granted = request();
    if granted {
        debug!("Accessibility permission granted");
    } else {
        warn!("Accessibility permission not granted, selection access may fail");
    }
    granted
}

pub(super) fn services() -> Result<PlatformServices> {
    retouch_mac::init().map_err(|e| init_error(e.as_ref()))?;
    let trusted = prompt_if_untrusted(
        retouch_mac::is_accessibility_enabled(),
        retouch_mac::request_accessibility_permission,
    );
    debug!(trusted, "macOS platform services ready");

    Ok(PlatformServices {
        name: retouch_mac::platform_name(),
        focus: Arc::new(MacFocusedText::default()),
        clipboard: Arc::new(MacClipboard::default()),
        notifier: Arc::new(NativeNotifier::new(retouch_mac::notification::show)),
    })
}

pub(super) fn status() -> PlatformStatus {
    let permission = retouch_mac::check_permission();
    PlatformStatus {
        name: retouch_mac::platform_name(),
        has_permission: permission.is_granted,
        message: permission.description,
        instructions: (!permission.is_granted)
            .then(|| retouch_mac::get_permission_instructions().to_string()),
    }
}
