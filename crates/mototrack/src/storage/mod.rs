//! Storage layer for mototrack.
//!
//! This module provides `SQLite`-based persistent storage for device-local
//! state: user preferences and the schedule of local notifications.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::notify::{Notification, NotificationKind, Priority, Trigger};

/// Storage shared between services. Access is synchronous and short.
pub type SharedStorage = Arc<Mutex<Storage>>;

/// A notification row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledNotification {
    /// Row id, used as the notification identifier.
    pub id: i64,
    /// The scheduled content and trigger.
    pub notification: Notification,
    /// Next time the notification fires.
    pub fire_at: DateTime<Utc>,
    /// When a one-shot notification was delivered.
    pub delivered_at: Option<DateTime<Utc>>,
    /// When it was scheduled.
    pub created_at: DateTime<Utc>,
}

/// Storage engine for device-local state.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

const NOTIFICATION_COLUMNS: &str = "id, kind, motorcycle_id, title, body, trigger_spec, priority, \
     sound, fire_at, delivered_at, created_at";

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).map_or_else(
        |_| {
            warn!(value, "unparseable timestamp in database");
            Utc::now()
        },
        |dt| dt.with_timezone(&Utc),
    )
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories if needed and brings the schema up to
    /// date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let mut conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&mut conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&mut conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Wrap this storage for sharing.
    #[must_use]
    pub fn into_shared(self) -> SharedStorage {
        Arc::new(Mutex::new(self))
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // === Preferences ===

    /// Read a preference.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_pref(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Write a preference, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_pref(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value, timestamp(Utc::now())],
        )?;
        debug!(key, "preference saved");
        Ok(())
    }

    /// Remove a preference. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_pref(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM preferences WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }

    /// Every stored preference, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn all_prefs(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM preferences ORDER BY key")?;
        let prefs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(prefs)
    }

    // === Notifications ===

    /// Store a notification that fires at `fire_at`. Returns its row id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_notification(
        &self,
        notification: &Notification,
        fire_at: DateTime<Utc>,
    ) -> Result<i64> {
        let trigger = serde_json::to_string(&notification.trigger)?;
        self.conn.execute(
            r"
            INSERT INTO notifications
                (kind, motorcycle_id, title, body, trigger_spec, priority, sound, fire_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
            params![
                notification.kind.as_str(),
                notification.motorcycle_id,
                notification.title,
                notification.body,
                trigger,
                notification.priority.as_str(),
                notification.sound,
                timestamp(fire_at),
                timestamp(Utc::now()),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!(id, kind = %notification.kind, "notification stored");
        Ok(id)
    }

    /// Get a notification by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_notification(&self, id: i64) -> Result<Option<ScheduledNotification>> {
        let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, [id], Self::row_to_notification)
            .optional()?;
        Ok(row)
    }

    /// Notifications that have not fired yet, soonest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn pending_notifications(&self) -> Result<Vec<ScheduledNotification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE delivered_at IS NULL ORDER BY fire_at, id"
        );
        self.query_notifications(&sql, [])
    }

    /// Pending notifications whose fire time is at or before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn due_notifications(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledNotification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE delivered_at IS NULL AND fire_at <= ?1 ORDER BY fire_at, id"
        );
        self.query_notifications(&sql, [timestamp(now)])
    }

    /// Most recently scheduled notifications, delivered or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent_notifications(&self, limit: usize) -> Result<Vec<ScheduledNotification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications ORDER BY created_at DESC, id DESC LIMIT ?1"
        );
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_notifications(&sql, [limit_i64])
    }

    /// Record delivery of a notification at `now`.
    ///
    /// One-shot notifications get a delivery time. Daily ones move their fire
    /// time to the next day after `now` and stay pending. Returns `false` if
    /// no pending notification has that id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn mark_delivered(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let Some(scheduled) = self.get_notification(id)? else {
            return Ok(false);
        };
        if scheduled.delivered_at.is_some() {
            return Ok(false);
        }

        let affected = if scheduled.notification.trigger.is_repeating() {
            let mut next = scheduled.fire_at;
            while next <= now {
                next += TimeDelta::days(1);
            }
            self.conn.execute(
                "UPDATE notifications SET fire_at = ?1 WHERE id = ?2",
                params![timestamp(next), id],
            )?
        } else {
            self.conn.execute(
                "UPDATE notifications SET delivered_at = ?1 WHERE id = ?2",
                params![timestamp(now), id],
            )?
        };
        Ok(affected > 0)
    }

    /// Drop every pending notification. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn cancel_pending_notifications(&self) -> Result<usize> {
        let affected = self
            .conn
            .execute("DELETE FROM notifications WHERE delivered_at IS NULL", [])?;
        if affected > 0 {
            info!("Cancelled {} scheduled notifications", affected);
        }
        Ok(affected)
    }

    /// Remove the whole notification history, pending or delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear_notifications(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM notifications", [])?)
    }

    /// Count stored notifications.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn notification_count(&self) -> Result<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM notifications", [], |row| row.get(0))?;
        Ok(count)
    }

    fn query_notifications(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<ScheduledNotification>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, Self::row_to_notification)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn row_to_notification(row: &rusqlite::Row) -> rusqlite::Result<ScheduledNotification> {
        let id: i64 = row.get(0)?;
        let kind_str: String = row.get(1)?;
        let motorcycle_id: Option<i64> = row.get(2)?;
        let title: String = row.get(3)?;
        let body: String = row.get(4)?;
        let trigger_str: String = row.get(5)?;
        let priority_str: String = row.get(6)?;
        let sound: bool = row.get(7)?;
        let fire_at: String = row.get(8)?;
        let delivered_at: Option<String> = row.get(9)?;
        let created_at: String = row.get(10)?;

        let kind = NotificationKind::parse(&kind_str).unwrap_or_else(|| {
            warn!("Unknown notification kind: {}, defaulting to reminder", kind_str);
            NotificationKind::Reminder
        });
        let trigger: Trigger = serde_json::from_str(&trigger_str).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(err))
        })?;

        Ok(ScheduledNotification {
            id,
            notification: Notification {
                kind,
                motorcycle_id,
                title,
                body,
                trigger,
                priority: Priority::parse(&priority_str),
                sound,
            },
            fire_at: parse_timestamp(&fire_at),
            delivered_at: delivered_at.as_deref().map(parse_timestamp),
            created_at: parse_timestamp(&created_at),
        })
    }
}
