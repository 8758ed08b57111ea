//! Ephemeral user-facing notifications with auto-expiry.
//!
//! Every store reports outcomes here. Entries keep insertion order and
//! remove themselves after a severity-specific duration unless pinned with
//! a zero duration. Expiry timers need a running Tokio runtime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::models::{Notification, Severity};

/// Ordered queue of live notifications.
pub struct NotificationQueue {
    inner: Mutex<Inner>,
    changed: watch::Sender<u64>,
}

struct Inner {
    entries: Vec<Notification>,
    timers: HashMap<String, JoinHandle<()>>,
}

impl NotificationQueue {
    #[must_use]
    pub fn new() -> Arc<Self> {
        let (changed, _) = watch::channel(0);
        Arc::new(Self {
            inner: Mutex::new(Inner {
                entries: Vec::new(),
                timers: HashMap::new(),
            }),
            changed,
        })
    }

    /// Append a notification and schedule its removal.
    ///
    /// A `duration` of zero pins the entry until it is dismissed manually;
    /// `None` uses the severity default. Returns the assigned id.
    pub fn push(
        self: &Arc<Self>,
        severity: Severity,
        message: impl Into<String>,
        duration: Option<Duration>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let ttl = duration.unwrap_or_else(|| severity.default_duration());

        let mut inner = self.lock();
        inner.entries.push(Notification {
            id: id.clone(),
            severity,
            message: message.into(),
            created_at: Utc::now(),
        });

        if !ttl.is_zero() {
            let queue = Arc::clone(self);
            let timer_id = id.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                queue.expire(&timer_id);
            });
            inner.timers.insert(id.clone(), handle);
        }
        drop(inner);

        self.touch();
        id
    }

    /// Shorthand for a success notification with the default duration.
    pub fn success(self: &Arc<Self>, message: impl Into<String>) -> String {
        self.push(Severity::Success, message, None)
    }

    /// Shorthand for an error notification with the default duration.
    pub fn error(self: &Arc<Self>, message: impl Into<String>) -> String {
        self.push(Severity::Error, message, None)
    }

    /// Shorthand for an info notification with the default duration.
    pub fn info(self: &Arc<Self>, message: impl Into<String>) -> String {
        self.push(Severity::Info, message, None)
    }

    /// Shorthand for a warning notification with the default duration.
    pub fn warning(self: &Arc<Self>, message: impl Into<String>) -> String {
        self.push(Severity::Warning, message, None)
    }

    /// Remove an entry now and cancel its timer.
    ///
    /// A no-op when the id is unknown or already expired, so it is safe to
    /// call twice.
    pub fn dismiss(&self, id: &str) {
        let mut inner = self.lock();
        if let Some(handle) = inner.timers.remove(id) {
            handle.abort();
        }
        let before = inner.entries.len();
        inner.entries.retain(|n| n.id != id);
        let removed = inner.entries.len() != before;
        drop(inner);

        if removed {
            self.touch();
        }
    }

    /// Remove every entry and cancel every pending timer.
    pub fn clear_all(&self) {
        let mut inner = self.lock();
        for handle in inner.timers.values() {
            handle.abort();
        }
        inner.timers.clear();
        let was_empty = inner.entries.is_empty();
        inner.entries.clear();
        drop(inner);

        if !was_empty {
            self.touch();
        }
    }

    /// Snapshot of the live notifications in insertion order.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().entries.clone()
    }

    /// Number of live notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Change notifications: the receiver wakes on every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    /// Timer-driven removal; the timer entry is already finished.
    fn expire(&self, id: &str) {
        let mut inner = self.lock();
        inner.timers.remove(id);
        let before = inner.entries.len();
        inner.entries.retain(|n| n.id != id);
        let removed = inner.entries.len() != before;
        drop(inner);

        if removed {
            self.touch();
        }
    }

    fn touch(&self) {
        self.changed.send_modify(|rev| *rev += 1);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
