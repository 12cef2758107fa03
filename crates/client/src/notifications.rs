//! Transient user notifications.
//!
//! Every posted notification removes itself after a fixed time-to-live,
//! independently of any other notification and of any user action.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DEFAULT_NOTIFICATION_TTL;
use crate::ids::MonotonicMillis;

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Info,
}

/// One banner-style message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Millisecond timestamp, unique within the process.
    pub id: u64,
    pub message: String,
    pub severity: Severity,
}

/// Append/expire queue of notifications.
///
/// Cheap to clone; clones share the queue. Posting requires a Tokio
/// runtime, which runs the expiry timers.
#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    items: Mutex<Vec<Notification>>,
    ttl: Duration,
    ids: Arc<MonotonicMillis>,
}

impl NotificationQueue {
    /// Create a queue with the default four-second TTL.
    #[must_use]
    pub fn new(ids: Arc<MonotonicMillis>) -> Self {
        Self::with_ttl(ids, DEFAULT_NOTIFICATION_TTL)
    }

    #[must_use]
    pub fn with_ttl(ids: Arc<MonotonicMillis>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                items: Mutex::new(Vec::new()),
                ttl,
                ids,
            }),
        }
    }

    /// Append a notification and schedule its removal.
    ///
    /// Returns the notification id.
    pub fn post(&self, message: impl Into<String>, severity: Severity) -> u64 {
        let notification = Notification {
            id: self.inner.ids.next(),
            message: message.into(),
            severity,
        };
        let id = notification.id;
        debug!(id, ?severity, message = %notification.message, "Notification posted");
        self.inner.items.lock().push(notification);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(id, "No async runtime, notification will not expire");
            return id;
        };
        let weak = Arc::downgrade(&self.inner);
        let ttl = self.inner.ttl;
        runtime.spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(inner) = weak.upgrade() {
                inner.items.lock().retain(|n| n.id != id);
            }
        });
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.post(message, Severity::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.post(message, Severity::Error)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.post(message, Severity::Info)
    }

    /// Currently visible notifications, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        self.inner.items.lock().clone()
    }

    /// The most recent notification, if any is visible.
    #[must_use]
    pub fn latest(&self) -> Option<Notification> {
        self.inner.items.lock().last().cloned()
    }
}

impl std::fmt::Debug for NotificationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationQueue")
            .field("visible", &self.inner.items.lock().len())
            .field("ttl", &self.inner.ttl)
            .finish()
    }
}
