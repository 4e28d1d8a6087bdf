//! Turns fleet events into scheduled notifications.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::i18n::Language;
use crate::motorcycle::FleetStats;
use crate::outbox::FleetEvent;

use super::{maintenance_reminder, new_motorcycle, status_change, Notification, Notifier};

/// Notifications that follow from one event.
///
/// - created: announcement, then a maintenance reminder if due
/// - updated: status change if the cached previous version had another
///   status, then a maintenance reminder if due
/// - deleted: nothing
#[must_use]
pub fn notifications_for(event: &FleetEvent, lang: Language) -> Vec<Notification> {
    match event {
        FleetEvent::Created { motorcycle } => std::iter::once(new_motorcycle(motorcycle, lang))
            .chain(maintenance_reminder(motorcycle, lang))
            .collect(),
        FleetEvent::Updated { previous, current } => previous
            .as_ref()
            .filter(|previous| previous.status != current.status)
            .map(|previous| status_change(current, previous.status, lang))
            .into_iter()
            .chain(maintenance_reminder(current, lang))
            .collect(),
        FleetEvent::Deleted { .. } => Vec::new(),
    }
}

/// Outcome of a dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Notifications handed to the notifier successfully.
    pub scheduled: usize,
    /// Notifications the notifier rejected.
    pub failed: usize,
    /// Notifications not attempted because notifications are disabled.
    pub skipped: usize,
}

/// Schedules the notifications for fleet events.
///
/// Scheduling failures are logged and counted; they never fail the mutation
/// that produced the event.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    language: Language,
    enabled: bool,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("language", &self.language)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, language: Language, enabled: bool) -> Self {
        Self {
            notifier,
            language,
            enabled,
        }
    }

    /// Check if notifications will be scheduled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Schedule the notifications for each event, in order.
    pub async fn dispatch(&self, events: Vec<FleetEvent>) -> DispatchReport {
        let mut report = DispatchReport::default();
        for event in &events {
            let notifications = notifications_for(event, self.language);
            if !self.enabled {
                report.skipped += notifications.len();
                continue;
            }
            debug!(
                event = event.name(),
                motorcycle_id = event.motorcycle_id(),
                count = notifications.len(),
                "dispatching notifications"
            );
            for notification in &notifications {
                self.schedule_one(notification, &mut report).await;
            }
        }
        report
    }

    /// Schedule the recurring daily summary.
    pub async fn schedule_daily_summary(&self, stats: &FleetStats) -> DispatchReport {
        let mut report = DispatchReport::default();
        if self.enabled {
            let notification = super::daily_summary(stats, self.language);
            self.schedule_one(&notification, &mut report).await;
        } else {
            report.skipped = 1;
        }
        report
    }

    async fn schedule_one(&self, notification: &Notification, report: &mut DispatchReport) {
        match self.notifier.schedule(notification).await {
            Ok(_) => report.scheduled += 1,
            Err(err) => {
                warn!(
                    kind = %notification.kind,
                    motorcycle_id = ?notification.motorcycle_id,
                    error = %err,
                    "failed to schedule notification"
                );
                report.failed += 1;
            }
        }
    }
}
