//! User preferences persisted on the device.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::i18n::Language;
use crate::notify::Notifier;
use crate::storage::SharedStorage;

/// Storage keys.
pub mod keys {
    /// `light` or `dark`.
    pub const THEME: &str = "theme";
    /// `pt` or `es`.
    pub const LANGUAGE: &str = "language";
    /// `true` or `false`.
    pub const NOTIFICATIONS_ENABLED: &str = "notifications_enabled";
    /// RFC 3339 timestamp of the previous visit.
    pub const LAST_VISIT: &str = "lastVisit";
    /// Push registration token.
    pub const PUSH_TOKEN: &str = "pushToken";
    /// JSON-encoded signed-in session.
    pub const SESSION: &str = "session";
}

/// Color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background.
    #[default]
    Light,
    /// Dark background.
    Dark,
}

impl Theme {
    /// Persisted code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// The other theme.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

/// Read a stored value, falling back to the default when it is missing or
/// unreadable.
fn parse_or_default<T>(key: &str, stored: Option<String>) -> T
where
    T: FromStr + Default,
{
    match stored {
        None => T::default(),
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring invalid stored preference");
            T::default()
        }),
    }
}

/// Loaded preferences with write-through setters.
#[derive(Debug, Clone)]
pub struct Preferences {
    storage: SharedStorage,
    theme: Theme,
    language: Language,
    notifications_enabled: bool,
}

impl Preferences {
    /// Load preferences from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be read.
    pub fn load(storage: SharedStorage) -> Result<Self> {
        let (theme, language, notifications) = {
            let db = storage.lock();
            (
                db.get_pref(keys::THEME)?,
                db.get_pref(keys::LANGUAGE)?,
                db.get_pref(keys::NOTIFICATIONS_ENABLED)?,
            )
        };

        let notifications_enabled = match notifications.as_deref() {
            None | Some("true") => true,
            Some("false") => false,
            Some(other) => {
                warn!(value = other, "ignoring invalid notifications_enabled preference");
                true
            }
        };

        Ok(Self {
            theme: parse_or_default(keys::THEME, theme),
            language: parse_or_default(keys::LANGUAGE, language),
            notifications_enabled,
            storage,
        })
    }

    /// Storage the preferences are written to.
    #[must_use]
    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Current theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Set and persist the theme.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.storage.lock().set_pref(keys::THEME, theme.code())?;
        self.theme = theme;
        Ok(())
    }

    /// Switch between light and dark, returning the new theme.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let theme = self.theme.toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }

    /// Current language.
    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    /// Set and persist the language.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn set_language(&mut self, language: Language) -> Result<()> {
        self.storage.lock().set_pref(keys::LANGUAGE, language.code())?;
        self.language = language;
        Ok(())
    }

    /// Check if local notifications are enabled.
    #[must_use]
    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    /// Enable or disable notifications.
    ///
    /// Disabling cancels everything `notifier` still has scheduled and
    /// returns how many notifications were dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write or the cancellation fails.
    pub async fn set_notifications_enabled(
        &mut self,
        enabled: bool,
        notifier: &dyn Notifier,
    ) -> Result<usize> {
        self.storage
            .lock()
            .set_pref(keys::NOTIFICATIONS_ENABLED, if enabled { "true" } else { "false" })?;
        self.notifications_enabled = enabled;
        if enabled {
            return Ok(0);
        }
        let cancelled = notifier.cancel_all().await?;
        debug!(cancelled, "notifications disabled");
        Ok(cancelled)
    }

    /// Time of the previous visit, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub fn last_visit(&self) -> Result<Option<DateTime<Utc>>> {
        let stored = self.storage.lock().get_pref(keys::LAST_VISIT)?;
        Ok(stored.and_then(|raw| match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(_) => {
                warn!(value = %raw, "ignoring invalid lastVisit preference");
                None
            }
        }))
    }

    /// Record a visit at `now`, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database access fails.
    pub fn touch_last_visit(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let previous = self.last_visit()?;
        self.storage
            .lock()
            .set_pref(keys::LAST_VISIT, &now.to_rfc3339())?;
        Ok(previous)
    }

    /// Stored push token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub fn push_token(&self) -> Result<Option<String>> {
        self.storage.lock().get_pref(keys::PUSH_TOKEN)
    }

    /// Store the push token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn set_push_token(&self, token: &str) -> Result<()> {
        self.storage.lock().set_pref(keys::PUSH_TOKEN, token)
    }

    /// Read a JSON-encoded value. Undecodable values are dropped with a
    /// warning and read as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let stored = self.storage.lock().get_pref(key)?;
        Ok(stored.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "ignoring undecodable preference");
                None
            }
        }))
    }

    /// Store a value as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the database write fails.
    pub fn store_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.storage.lock().set_pref(key, &raw)
    }

    /// Remove a stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.storage.lock().delete_pref(key)?;
        Ok(())
    }
}
