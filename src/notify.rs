//! User-facing toasts ("state updated", "could not update state").

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// Secondary line, typically the server's error detail.
    pub caption: Option<String>,
}

impl Notification {
    pub fn positive(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Positive,
            message: message.into(),
            caption: None,
        }
    }

    pub fn negative(message: impl Into<String>, caption: Option<&str>) -> Self {
        Self {
            level: NotificationLevel::Negative,
            message: message.into(),
            caption: caption.map(str::to_string),
        }
    }
}

pub trait Notifier {
    fn notify(&self, notification: Notification);
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

/// Sends notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let caption = notification.caption.as_deref().unwrap_or("");
        match notification.level {
            NotificationLevel::Positive => info!(caption, "{}", notification.message),
            NotificationLevel::Negative => warn!(caption, "{}", notification.message),
        }
    }
}
