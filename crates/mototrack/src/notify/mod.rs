//! Local notifications for fleet changes.
//!
//! Notifications are built from fleet events by pure functions, then handed
//! to a [`Notifier`] for scheduling. The only notifier shipped here keeps the
//! schedule in the local database ([`StoredNotifier`]).

pub mod dispatcher;
pub mod reminder;
pub mod stored;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::i18n::Language;
use crate::motorcycle::{FleetStats, Motorcycle, MotorcycleId, MotorcycleStatus};

pub use dispatcher::{notifications_for, DispatchReport, NotificationDispatcher};
pub use reminder::{remaining_km, should_remind, MAINTENANCE_INTERVAL_KM, REMINDER_THRESHOLD_KM};
pub use stored::StoredNotifier;

/// What a notification is about. Serialized as the payload `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Service due soon.
    Maintenance,
    /// A motorcycle was registered.
    NewMotorcycle,
    /// A motorcycle changed status.
    StatusChange,
    /// Recurring summary.
    Reminder,
}

impl NotificationKind {
    /// Payload tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Maintenance => "maintenance",
            Self::NewMotorcycle => "new_motorcycle",
            Self::StatusChange => "status_change",
            Self::Reminder => "reminder",
        }
    }

    /// Parse a payload tag.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "maintenance" => Some(Self::Maintenance),
            "new_motorcycle" => Some(Self::NewMotorcycle),
            "status_change" => Some(Self::StatusChange),
            "reminder" => Some(Self::Reminder),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Quiet, no sound.
    Low,
    /// Normal.
    #[default]
    Default,
    /// Heads-up.
    High,
}

impl Priority {
    /// Storage tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Default => "default",
            Self::High => "high",
        }
    }

    /// Parse a storage tag, falling back to [`Priority::Default`].
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Default,
        }
    }
}

/// When a notification fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Once, after a delay from scheduling.
    After(Duration),
    /// Every day at a local wall-clock time.
    Daily {
        /// Hour, 0-23.
        hour: u32,
        /// Minute, 0-59.
        minute: u32,
    },
}

impl Trigger {
    /// First fire time for a notification scheduled at `now`.
    #[must_use]
    pub fn first_fire_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Self::After(delay) => {
                now + TimeDelta::from_std(delay).unwrap_or_else(|_| TimeDelta::zero())
            }
            Self::Daily { hour, minute } => next_daily(now, hour, minute),
        }
    }

    /// Check if the trigger repeats.
    #[must_use]
    pub fn is_repeating(&self) -> bool {
        matches!(self, Self::Daily { .. })
    }
}

/// Next local `hour:minute` strictly after `now`.
fn next_daily(now: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let local_now = now.with_timezone(&Local);
    let mut date = local_now.date_naive();
    for _ in 0..3 {
        if let Some(candidate) = date.and_time(time).and_local_timezone(Local).earliest() {
            let candidate = candidate.with_timezone(&Utc);
            if candidate > now {
                return candidate;
            }
        }
        date = date.succ_opt().unwrap_or(date);
    }
    now + TimeDelta::days(1)
}

/// A local notification ready to be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Payload `type`.
    pub kind: NotificationKind,
    /// Motorcycle the notification links to, if any.
    pub motorcycle_id: Option<MotorcycleId>,
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// When to fire.
    pub trigger: Trigger,
    /// Delivery priority.
    pub priority: Priority,
    /// Play a sound on delivery.
    pub sound: bool,
}

impl Notification {
    /// Data payload attached to the notification.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        let mut payload = serde_json::json!({ "type": self.kind.as_str() });
        if let Some(id) = self.motorcycle_id {
            payload["motorcycleId"] = serde_json::Value::String(id.to_string());
        }
        payload
    }

    /// Route opened when the user taps the notification.
    #[must_use]
    pub fn deep_link(&self) -> Option<String> {
        self.motorcycle_id.map(|id| format!("/motorcycle/{id}"))
    }
}

/// Schedules and cancels local notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Schedule a notification, returning its identifier.
    async fn schedule(&self, notification: &Notification) -> Result<String>;

    /// Cancel everything still scheduled, returning how many were dropped.
    async fn cancel_all(&self) -> Result<usize>;
}

fn status_label(status: MotorcycleStatus, lang: Language) -> &'static str {
    lang.messages().status_label(status)
}

/// Maintenance reminder for a motorcycle, if its mileage is close to a service.
#[must_use]
pub fn maintenance_reminder(motorcycle: &Motorcycle, lang: Language) -> Option<Notification> {
    if !should_remind(motorcycle.mileage) {
        return None;
    }
    let remaining = remaining_km(motorcycle.mileage);
    let body = match lang {
        Language::Pt => format!(
            "{} ({}) precisa de manutenção em breve. Faltam {remaining} km.",
            motorcycle.model_name, motorcycle.plate
        ),
        Language::Es => format!(
            "{} ({}) necesita mantenimiento pronto. Faltan {remaining} km.",
            motorcycle.model_name, motorcycle.plate
        ),
    };
    Some(Notification {
        kind: NotificationKind::Maintenance,
        motorcycle_id: Some(motorcycle.id),
        title: lang.messages().maintenance_title.to_string(),
        body,
        trigger: Trigger::After(Duration::from_secs(5)),
        priority: Priority::High,
        sound: true,
    })
}

/// Announcement for a newly registered motorcycle.
#[must_use]
pub fn new_motorcycle(motorcycle: &Motorcycle, lang: Language) -> Notification {
    let body = match lang {
        Language::Pt => format!(
            "{} ({}) foi adicionada ao sistema!",
            motorcycle.model_name, motorcycle.plate
        ),
        Language::Es => format!(
            "{} ({}) fue añadida al sistema!",
            motorcycle.model_name, motorcycle.plate
        ),
    };
    Notification {
        kind: NotificationKind::NewMotorcycle,
        motorcycle_id: Some(motorcycle.id),
        title: lang.messages().new_motorcycle_title.to_string(),
        body,
        trigger: Trigger::After(Duration::from_secs(2)),
        priority: Priority::Default,
        sound: true,
    }
}

/// Status change from `previous` to the motorcycle's current status.
#[must_use]
pub fn status_change(
    motorcycle: &Motorcycle,
    previous: MotorcycleStatus,
    lang: Language,
) -> Notification {
    let messages = lang.messages();
    Notification {
        kind: NotificationKind::StatusChange,
        motorcycle_id: Some(motorcycle.id),
        title: format!(
            "{} {}",
            motorcycle.status.emoji(),
            messages.status_updated_title
        ),
        body: format!(
            "{} ({}): {} → {}",
            motorcycle.model_name,
            motorcycle.plate,
            status_label(previous, lang),
            status_label(motorcycle.status, lang)
        ),
        trigger: Trigger::After(Duration::from_secs(1)),
        priority: Priority::High,
        sound: true,
    }
}

/// Daily fleet summary at 09:00.
#[must_use]
pub fn daily_summary(stats: &FleetStats, lang: Language) -> Notification {
    let body = match lang {
        Language::Pt => format!(
            "Total: {} | Disponíveis: {} | Manutenção: {}",
            stats.total, stats.available, stats.maintenance
        ),
        Language::Es => format!(
            "Total: {} | Disponibles: {} | Mantenimiento: {}",
            stats.total, stats.available, stats.maintenance
        ),
    };
    Notification {
        kind: NotificationKind::Reminder,
        motorcycle_id: None,
        title: lang.messages().daily_summary_title.to_string(),
        body,
        trigger: Trigger::Daily { hour: 9, minute: 0 },
        priority: Priority::Low,
        sound: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motorcycle::sample_motorcycle;
    use chrono::Timelike;

    #[test]
    fn test_maintenance_reminder_text() {
        let moto = sample_motorcycle(3, MotorcycleStatus::Available, 4700);
        let notification = maintenance_reminder(&moto, Language::Pt).unwrap();
        assert_eq!(notification.kind, NotificationKind::Maintenance);
        assert_eq!(notification.title, "🔧 Manutenção Necessária");
        assert_eq!(
            notification.body,
            "Honda CG 160 (ABC0003) precisa de manutenção em breve. Faltam 300 km."
        );
        assert_eq!(notification.trigger, Trigger::After(Duration::from_secs(5)));
        assert_eq!(notification.priority, Priority::High);
    }

    #[test]
    fn test_maintenance_reminder_skipped_far_from_service() {
        let moto = sample_motorcycle(3, MotorcycleStatus::Available, 4499);
        assert!(maintenance_reminder(&moto, Language::Pt).is_none());
    }

    #[test]
    fn test_new_motorcycle_in_spanish() {
        let moto = sample_motorcycle(8, MotorcycleStatus::Available, 0);
        let notification = new_motorcycle(&moto, Language::Es);
        assert_eq!(notification.title, "🏍️ Nueva Moto Registrada");
        assert!(notification.body.contains("fue añadida"));
        assert_eq!(notification.trigger, Trigger::After(Duration::from_secs(2)));
    }

    #[test]
    fn test_status_change_title_uses_new_status_emoji() {
        let moto = sample_motorcycle(4, MotorcycleStatus::Maintenance, 100);
        let notification = status_change(&moto, MotorcycleStatus::InUse, Language::Pt);
        assert_eq!(notification.title, "🔧 Status Atualizado");
        assert_eq!(notification.body, "Honda CG 160 (ABC0004): Em Uso → Manutenção");
        assert_eq!(notification.trigger, Trigger::After(Duration::from_secs(1)));
    }

    #[test]
    fn test_daily_summary() {
        let stats = FleetStats {
            total: 10,
            available: 6,
            in_use: 2,
            maintenance: 1,
            reserved: 1,
        };
        let notification = daily_summary(&stats, Language::Pt);
        assert_eq!(notification.kind, NotificationKind::Reminder);
        assert_eq!(notification.body, "Total: 10 | Disponíveis: 6 | Manutenção: 1");
        assert_eq!(notification.trigger, Trigger::Daily { hour: 9, minute: 0 });
        assert!(notification.motorcycle_id.is_none());
        assert!(!notification.sound);
    }

    #[test]
    fn test_payload_and_deep_link() {
        let moto = sample_motorcycle(12, MotorcycleStatus::Available, 0);
        let notification = new_motorcycle(&moto, Language::Pt);
        let payload = notification.payload();
        assert_eq!(payload["type"], "new_motorcycle");
        assert_eq!(payload["motorcycleId"], "12");
        assert_eq!(notification.deep_link().as_deref(), Some("/motorcycle/12"));

        let summary = daily_summary(&FleetStats::default(), Language::Pt);
        assert!(summary.payload().get("motorcycleId").is_none());
        assert!(summary.deep_link().is_none());
    }

    #[test]
    fn test_kind_tags() {
        for kind in [
            NotificationKind::Maintenance,
            NotificationKind::NewMotorcycle,
            NotificationKind::StatusChange,
            NotificationKind::Reminder,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert!(NotificationKind::parse("push").is_none());
    }

    #[test]
    fn test_after_trigger_fire_time() {
        let now = Utc::now();
        let fire = Trigger::After(Duration::from_secs(5)).first_fire_at(now);
        assert_eq!(fire - now, TimeDelta::seconds(5));
    }

    #[test]
    fn test_daily_trigger_is_next_local_occurrence() {
        let now = Utc::now();
        let fire = Trigger::Daily { hour: 9, minute: 0 }.first_fire_at(now);
        assert!(fire > now);
        assert!(fire - now <= TimeDelta::days(1) + TimeDelta::hours(1));
        let local = fire.with_timezone(&Local);
        assert_eq!((local.hour(), local.minute()), (9, 0));
    }

    #[test]
    fn test_trigger_serde() {
        let daily = Trigger::Daily { hour: 9, minute: 0 };
        let json = serde_json::to_string(&daily).unwrap();
        let back: Trigger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, daily);
        assert!(daily.is_repeating());
        assert!(!Trigger::After(Duration::from_secs(1)).is_repeating());
    }
}
