//! Transient user-facing notifications (toasts).

#[cfg(test)]
#[path = "notify_test.rs"]
mod tests;

use std::sync::Mutex;

use tracing::{info, warn};

/// Visual weight of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Default,
    Destructive,
}

/// A single toast: title, body text, and severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self { title: title.into(), description: description.into(), severity }
    }

    #[must_use]
    pub fn profile_updated() -> Self {
        Self::new("Profile Updated", "Your profile information has been saved.", Severity::Default)
    }

    #[must_use]
    pub fn update_failed() -> Self {
        Self::new(
            "Update Failed",
            "There was an error updating your profile. Please try again.",
            Severity::Destructive,
        )
    }

    #[must_use]
    pub fn account_created() -> Self {
        Self::new(
            "Account Created",
            "Your account has been successfully created and your data has been stored.",
            Severity::Default,
        )
    }

    #[must_use]
    pub fn account_error() -> Self {
        Self::new(
            "Error",
            "There was an error creating your account. Please try again.",
            Severity::Destructive,
        )
    }
}

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Notifier that writes each notification to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Default => {
                info!(title = %notification.title, description = %notification.description, "notification");
            }
            Severity::Destructive => {
                warn!(title = %notification.title, description = %notification.description, "notification");
            }
        }
    }
}

/// Notifier that keeps every notification in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    /// Number of recorded notifications carrying `title`.
    #[must_use]
    pub fn count_titled(&self, title: &str) -> usize {
        self.notifications().iter().filter(|n| n.title == title).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(notification);
        }
    }
}
