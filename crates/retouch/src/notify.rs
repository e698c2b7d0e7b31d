//! User-visible notifications.

use std::fmt;

use tracing::{error, info, warn};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// The operation completed.
    Success,
    /// Nothing was done, but nothing went wrong either.
    Info,
    /// The operation failed.
    Failure,
}

/// A single user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Short headline.
    pub title: String,
    /// Detail line.
    pub body: String,
}

impl Notice {
    /// Build a success notice.
    pub fn success(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, title, body)
    }

    /// Build an informational notice.
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, body)
    }

    /// Build a failure notice.
    pub fn failure(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Failure, title, body)
    }

    fn new(level: NoticeLevel, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            body: body.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.body)
    }
}

/// Delivers notices to the user.
pub trait Notifier: Send + Sync {
    /// Show `notice`. Must not fail; delivery problems are logged.
    fn notify(&self, notice: &Notice);
}

/// Notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Success | NoticeLevel::Info => {
                info!(title = %notice.title, body = %notice.body, "Notice");
            }
            NoticeLevel::Failure => {
                error!(title = %notice.title, body = %notice.body, "Notice");
            }
        }
    }
}

/// Notifier that logs and then forwards to a native display function.
pub struct NativeNotifier {
    show: fn(&str, &str),
}

impl NativeNotifier {
    /// Wrap a platform display function.
    #[must_use]
    pub fn new(show: fn(&str, &str)) -> Self {
        Self { show }
    }
}

impl fmt::Debug for NativeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeNotifier").finish_non_exhaustive()
    }
}

impl Notifier for NativeNotifier {
    fn notify(&self, notice: &Notice) {
        LogNotifier.notify(notice);
        if notice.title.is_empty() {
            warn!("Skipping native notification without a title");
            return;
        }
        (self.show)(&notice.title, &notice.body);
    }
}
