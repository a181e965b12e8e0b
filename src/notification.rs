//! Toast notifications pushed to the host.
//!
//! Background operations report their outcome as [`Notification`]s sent
//! through an unbounded channel; the host drains the receiver and displays
//! them as transient messages.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// The type of notification, which determines its appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// An operation finished.
    Success,
    /// An operation failed.
    Error,
}

/// A single notification message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// The notification message, may contain `<b>` markup.
    pub message: String,
    /// The type of notification.
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// How long the host should display it, in milliseconds.
    pub duration_ms: u64,
}

impl Notification {
    /// Create a new notification.
    pub fn new(
        message: impl Into<String>,
        notification_type: NotificationType,
        duration: Duration,
    ) -> Self {
        Self {
            message: message.into(),
            notification_type,
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Create a success notification with default duration (3 seconds).
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, NotificationType::Success, Duration::from_secs(3))
    }

    /// Create an error notification with default duration (5 seconds).
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, NotificationType::Error, Duration::from_secs(5))
    }
}

/// Sending half of the notification channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Wrap an existing sender.
    pub fn new(tx: mpsc::UnboundedSender<Notification>) -> Self {
        Self { tx }
    }

    /// Send a notification. Dropped silently if the host stopped listening.
    pub fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("Notification receiver closed, dropping notification");
        }
    }
}

/// Create a notification channel.
///
/// Returns a tuple of (notifier, receiver). The receiver should be drained
/// by the host.
pub fn channel() -> (Notifier, mpsc::UnboundedReceiver<Notification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Notifier::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_durations() {
        assert_eq!(Notification::success("x").duration_ms, 3000);
        assert_eq!(Notification::error("x").duration_ms, 5000);
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&Notification::error("boom")).unwrap();
        assert_eq!(json, r#"{"message":"boom","type":"error","duration_ms":5000}"#);

        let custom = Notification::new("done", NotificationType::Success, Duration::from_millis(1500));
        let json = serde_json::to_string(&custom).unwrap();
        assert_eq!(json, r#"{"message":"done","type":"success","duration_ms":1500}"#);
    }

    #[tokio::test]
    async fn test_channel_delivers() {
        let (notifier, mut rx) = channel();
        notifier.notify(Notification::success("done"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.message, "done");
        assert_eq!(received.notification_type, NotificationType::Success);
    }

    #[test]
    fn test_notify_after_receiver_dropped() {
        let (notifier, rx) = channel();
        drop(rx);
        notifier.notify(Notification::success("nobody listens"));
    }
}
