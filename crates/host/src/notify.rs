//! Publish notifications

use auction_core::{format_hash, Hash};
use serde::Serialize;
use tokio::sync::broadcast;

/// Default channel capacity
pub const NOTIFY_CAPACITY: usize = 64;

/// Three-state outcome of a mutation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Submitted, awaiting confirmation
    Pending,
    /// Confirmed
    Success,
    /// Rejected or timed out; the prior root still stands
    Failure {
        /// What went wrong
        reason: String,
    },
}

/// One notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Root being published, `0x` hex
    pub root: String,
    /// Outcome so far
    #[serde(flatten)]
    pub status: NotificationStatus,
}

impl Notification {
    fn new(root: &Hash, status: NotificationStatus) -> Self {
        Self { root: format_hash(root), status }
    }
}

/// Fan-out of publish notifications. Sending with no subscribers is fine.
#[derive(Clone, Debug)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(NOTIFY_CAPACITY)
    }
}

impl Notifier {
    /// Channel with `capacity` buffered notifications per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// New receiver seeing notifications sent from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub(crate) fn pending(&self, root: &Hash) {
        let _ = self.sender.send(Notification::new(root, NotificationStatus::Pending));
    }

    pub(crate) fn success(&self, root: &Hash) {
        let _ = self.sender.send(Notification::new(root, NotificationStatus::Success));
    }

    pub(crate) fn failure(&self, root: &Hash, reason: impl std::fmt::Display) {
        let _ = self
            .sender
            .send(Notification::new(root, NotificationStatus::Failure { reason: reason.to_string() }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notifications_in_order() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        let root = [0xab; 32];

        notifier.pending(&root);
        notifier.failure(&root, "reverted");

        assert_eq!(rx.recv().await.unwrap().status, NotificationStatus::Pending);
        let failed = rx.recv().await.unwrap();
        assert_eq!(failed.status, NotificationStatus::Failure { reason: "reverted".to_string() });
        assert!(failed.root.starts_with("0xabab"));
    }

    #[test]
    fn test_send_without_subscribers() {
        Notifier::new(1).success(&[0u8; 32]);
    }

    #[test]
    fn test_notification_json() {
        let n = Notification::new(&[0u8; 32], NotificationStatus::Success);
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["status"], "success");
        assert!(json["root"].as_str().unwrap().starts_with("0x0000"));
    }
}
