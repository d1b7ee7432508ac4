//! User-visible notifications (toasts).

use std::fmt;

/// Severity of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationType {
    Default,
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationType::Default => "default",
            NotificationType::Info => "info",
            NotificationType::Success => "success",
            NotificationType::Warning => "warning",
            NotificationType::Error => "error",
        })
    }
}

/// Port for showing notifications to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationType, message: &str, title: &str);

    fn info(&self, message: &str, title: &str) {
        self.notify(NotificationType::Info, message, title);
    }

    fn success(&self, message: &str, title: &str) {
        self.notify(NotificationType::Success, message, title);
    }

    fn error(&self, message: &str, title: &str) {
        self.notify(NotificationType::Error, message, title);
    }
}

/// Notifier writing every notification as a tracing event.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotificationType, message: &str, title: &str) {
        match kind {
            NotificationType::Error => tracing::error!(%kind, title, message, "notification"),
            NotificationType::Warning => tracing::warn!(%kind, title, message, "notification"),
            _ => tracing::info!(%kind, title, message, "notification"),
        }
    }
}
