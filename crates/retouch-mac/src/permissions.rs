//! Accessibility permission checks.
//!
//! Reading or replacing the selection in another application, and sending it
//! synthetic Cmd+C / Cmd+V, both require the process to be trusted for
//! accessibility.

use macos_accessibility_client::accessibility;

/// Current accessibility permission status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionStatus {
    /// Whether accessibility permission is currently granted.
    pub is_granted: bool,

    /// Human-readable description of the status.
    pub description: String,
}

impl PermissionStatus {
    /// Create a new granted status.
    #[must_use]
    pub fn granted() -> Self {
        Self {
            is_granted: true,
            description: "Accessibility permission is granted".to_string(),
        }
    }

    /// Create a new not-granted status.
    #[must_use]
    pub fn not_granted() -> Self {
        Self {
            is_granted: false,
            description: "Accessibility permission is not granted".to_string(),
        }
    }
}

/// Whether this process is trusted for accessibility.
#[must_use]
pub fn is_accessibility_enabled() -> bool {
    accessibility::application_is_trusted()
}

/// Check accessibility permission status.
#[must_use]
pub fn check_permission() -> PermissionStatus {
    if is_accessibility_enabled() {
        PermissionStatus::granted()
    } else {
        PermissionStatus::not_granted()
    }
}

/// Ask macOS to show the accessibility prompt for this process.
///
/// Returns `true` if the process is already trusted.
#[must_use]
pub fn request_accessibility_permission() -> bool {
    accessibility::application_is_trusted_with_prompt()
}

/// Instructions for granting accessibility permission.
#[must_use]
pub fn get_permission_instructions() -> &'static str {
    r"To let retouch read and replace selected text:

1. Open System Settings
2. Go to Privacy & Security > Accessibility
3. Enable the terminal or launcher that runs 'retouch'
4. If it is not listed, click the '+' button and add it"
}
