//! Listener-facing notifications
//!
//! The player never returns runtime failures to its caller. Progress and
//! problems are reported as short [`Notification`]s through a [`Notifier`],
//! which the embedding application turns into toasts, log lines or
//! WebSocket messages.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }
}

/// Sink for notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info => tracing::info!("{}", notification.message),
            NotificationLevel::Success => tracing::info!(status = "ok", "{}", notification.message),
            NotificationLevel::Error => tracing::error!("{}", notification.message),
        }
    }
}

/// Discards notifications
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: Notification) {}
}

/// Logs notifications and fans them out to subscribers
#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        LoggingNotifier.notify(notification.clone());
        // No subscribers is fine
        let _ = self.tx.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_level() {
        assert_eq!(Notification::info("a").level, NotificationLevel::Info);
        assert_eq!(Notification::success("b").level, NotificationLevel::Success);
        assert_eq!(Notification::error("c").level, NotificationLevel::Error);
    }

    #[test]
    fn test_broadcast_reaches_subscribers() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe();

        notifier.notify(Notification::info("Trying alternate stream..."));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.message, "Trying alternate stream...");
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let notifier = BroadcastNotifier::new(8);
        notifier.notify(Notification::error("nobody listening"));
    }

    #[test]
    fn test_serializes_lowercase_level() {
        let json = serde_json::to_value(Notification::success("ok")).unwrap();
        assert_eq!(json["level"], "success");
    }
}
