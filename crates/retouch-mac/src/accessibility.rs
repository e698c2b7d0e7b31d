//! Focused-element selection access for macOS.
//!
//! Reads and replaces the selected text of the focused UI element in the
//! frontmost application through System Events, which sits on top of the
//! Accessibility API. Requires accessibility permission.

use thiserror::Error;
use tracing::{debug, trace};

use crate::permissions;
use crate::script::{self, ScriptError};

/// Errors from the accessibility bridge.
#[derive(Debug, Error)]
pub enum AccessibilityError {
    /// Accessibility permission is not granted.
    #[error("accessibility permission not granted: {0}")]
    PermissionDenied(String),

    /// The focused element refused the new value.
    #[error("failed to set selected text: {0}")]
    WriteRejected(String),
}

/// Outcome of reading the focused element's selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRead {
    /// The selected text, exactly as reported.
    Text(String),

    /// A text element is focused but nothing is selected.
    Empty,

    /// The focused element is a password field.
    Secure,

    /// No focused element, or it does not expose its selection.
    Unavailable(String),
}

const READ_SELECTION_SCRIPT: &str = r#"
tell application "System Events"
    set frontApp to first application process whose frontmost is true
    try
        set focusedElement to value of attribute "AXFocusedUIElement" of frontApp
    on error
        return "unavailable:no focused element"
    end try
    try
        if value of attribute "AXSubrole" of focusedElement is "AXSecureTextField" then return "secure:"
    end try
    try
        if value of attribute "AXRole" of focusedElement is "AXSecureTextField" then return "secure:"
    end try
    try
        set selectedText to value of attribute "AXSelectedText" of focusedElement
    on error
        return "unavailable:selected text not supported"
    end try
    if selectedText is missing value then return "unavailable:selected text not supported"
    return "text:" & selectedText
end tell
"#;

const WRITE_SELECTION_SCRIPT: &str = r#"
on run argv
    set newText to item 1 of argv
    tell application "System Events"
        set frontApp to first application process whose frontmost is true
        set focusedElement to value of attribute "AXFocusedUIElement" of frontApp
        set value of attribute "AXSelectedText" of focusedElement to newText
    end tell
    return "ok"
end run
"#;

const FRONTMOST_APP_SCRIPT: &str =
    r#"tell application "System Events" to get name of first process whose frontmost is true"#;

/// Reads and writes the focused element's selected text.
#[derive(Debug, Default)]
pub struct AccessibilityBridge;

impl AccessibilityBridge {
    /// Create a new bridge.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Check if accessibility permissions are enabled.
    #[must_use]
    pub fn has_permission(&self) -> bool {
        permissions::is_accessibility_enabled()
    }

    /// Read the focused element's current selection.
    #[must_use]
    pub fn read_selection(&self) -> SelectionRead {
        if !self.has_permission() {
            return SelectionRead::Unavailable("accessibility permission not granted".to_string());
        }

        match script::run(READ_SELECTION_SCRIPT, &[]) {
            Ok(output) => parse_selection_output(output),
            Err(e) => {
                trace!(error = %e, "Selection query failed");
                SelectionRead::Unavailable(e.to_string())
            }
        }
    }

    /// Replace the focused element's selection with `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if permission is missing or the element rejects the
    /// new value.
    pub fn write_selection(&self, text: &str) -> Result<(), AccessibilityError> {
        if !self.has_permission() {
            return Err(AccessibilityError::PermissionDenied(
                permissions::get_permission_instructions().to_string(),
            ));
        }

        script::run(WRITE_SELECTION_SCRIPT, &[text]).map_err(|e| match e {
            ScriptError::Launch(msg) | ScriptError::Failed(msg) => {
                AccessibilityError::WriteRejected(msg)
            }
        })?;
        debug!(len = text.len(), "Replaced selection via accessibility");
        Ok(())
    }
}

/// Decode the tagged output of the selection script.
fn parse_selection_output(output: String) -> SelectionRead {
    if let Some(text) = output.strip_prefix("text:") {
        if text.is_empty() {
            SelectionRead::Empty
        } else {
            SelectionRead::Text(text.to_string())
        }
    } else if output.starts_with("secure:") {
        SelectionRead::Secure
    } else if let Some(reason) = output.strip_prefix("unavailable:") {
        SelectionRead::Unavailable(reason.to_string())
    } else {
        SelectionRead::Unavailable("unexpected script output".to_string())
    }
}

/// Get the name of the frontmost application.
#[must_use]
pub fn frontmost_app_name() -> Option<String> {
    let name = script::run(FRONTMOST_APP_SCRIPT, &[]).ok()?;
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_keeps_whitespace() {
        assert_eq!(
            parse_selection_output("text:  two spaces \n inside ".to_string()),
            SelectionRead::Text("  two spaces \n inside ".to_string())
        );
    }

    #[test]
    fn test_parse_empty_selection() {
        assert_eq!(
            parse_selection_output("text:".to_string()),
            SelectionRead::Empty
        );
    }

    #[test]
    fn test_parse_secure_field() {
        assert_eq!(
            parse_selection_output("secure:".to_string()),
            SelectionRead::Secure
        );
    }

    #[test]
    fn test_parse_unavailable() {
        assert_eq!(
            parse_selection_output("unavailable:no focused element".to_string()),
            SelectionRead::Unavailable("no focused element".to_string())
        );
    }

    #[test]
    fn test_parse_unexpected_output() {
        assert!(matches!(
            parse_selection_output("garbage".to_string()),
            SelectionRead::Unavailable(_)
        ));
    }

    #[test]
    fn test_accessibility_error_display() {
        let err = AccessibilityError::WriteRejected("read-only".to_string());
        assert_eq!(err.to_string(), "failed to set selected text: read-only");
    }

    #[test]
    fn test_bridge_debug() {
        let bridge = AccessibilityBridge::new();
        assert!(format!("{bridge:?}").contains("AccessibilityBridge"));
    }

    #[test]
    #[ignore = "requires accessibility permission and a focused text field"]
    fn test_read_selection_live() {
        let bridge = AccessibilityBridge::new();
        let _ = bridge.read_selection();
    }
}
