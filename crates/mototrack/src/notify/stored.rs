//! Notifier backed by the local database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::Result;
use crate::storage::{ScheduledNotification, SharedStorage};

use super::{Notification, Notifier};

/// Keeps the notification schedule in [`crate::storage::Storage`].
///
/// Delivery is pull-based: whoever shows notifications asks for
/// [`StoredNotifier::take_due`] and presents what comes back.
#[derive(Debug, Clone)]
pub struct StoredNotifier {
    storage: SharedStorage,
}

impl StoredNotifier {
    /// Create a notifier over shared storage.
    #[must_use]
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// Everything still waiting to fire.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn pending(&self) -> Result<Vec<ScheduledNotification>> {
        self.storage.lock().pending_notifications()
    }

    /// Most recent notifications, delivered or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn recent(&self, limit: usize) -> Result<Vec<ScheduledNotification>> {
        self.storage.lock().recent_notifications(limit)
    }

    /// Return the notifications due at `now` and mark them delivered.
    ///
    /// Daily notifications are moved to their next occurrence.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn take_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledNotification>> {
        let storage = self.storage.lock();
        let due = storage.due_notifications(now)?;
        for scheduled in &due {
            storage.mark_delivered(scheduled.id, now)?;
        }
        Ok(due)
    }

    /// Forget every notification, delivered ones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn clear_history(&self) -> Result<usize> {
        self.storage.lock().clear_notifications()
    }
}

#[async_trait]
impl Notifier for StoredNotifier {
    async fn schedule(&self, notification: &Notification) -> Result<String> {
        let fire_at = notification.trigger.first_fire_at(Utc::now());
        let id = self
            .storage
            .lock()
            .insert_notification(notification, fire_at)?;
        debug!(id, kind = %notification.kind, %fire_at, "notification scheduled");
        Ok(id.to_string())
    }

    async fn cancel_all(&self) -> Result<usize> {
        self.storage.lock().cancel_pending_notifications()
    }
}
