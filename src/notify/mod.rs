//! Notification collaborator.
//!
//! Notifications are fire-and-forget: the feed keeps the most recent ones until
//! the UI drains them.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::models::{Notification, NotificationKind};

pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: Option<String>);
}

/// Bounded in-memory feed; the oldest entries are dropped first.
pub struct NotificationFeed {
    entries: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl NotificationFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Take every pending notification, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.drain(..).collect()
    }
}

impl Notifier for NotificationFeed {
    fn notify(&self, kind: NotificationKind, message: Option<String>) {
        match (&kind, &message) {
            (NotificationKind::Error, Some(msg)) => tracing::warn!("Notifying error: {}", msg),
            _ => tracing::debug!("Notifying {:?}", kind),
        }

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(Notification::new(kind, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_returns_in_order() {
        let feed = NotificationFeed::new(10);
        feed.notify(NotificationKind::Update, None);
        feed.notify(NotificationKind::Error, Some("Card declined".to_string()));

        let drained = feed.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].kind, NotificationKind::Update);
        assert_eq!(drained[1].message.as_deref(), Some("Card declined"));
        assert!(feed.drain().is_empty());
    }

    #[test]
    fn test_oldest_dropped_at_capacity() {
        let feed = NotificationFeed::new(2);
        for i in 0..3 {
            feed.notify(NotificationKind::Error, Some(format!("failure {}", i)));
        }

        let messages: Vec<_> = feed.drain().into_iter().filter_map(|n| n.message).collect();
        assert_eq!(messages, vec!["failure 1", "failure 2"]);
    }
}
