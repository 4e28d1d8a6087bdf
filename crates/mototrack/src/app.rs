//! Application wiring.
//!
//! [`App`] owns one instance of every service and connects them the way the
//! `motoctl` commands use them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::auth::{AuthService, FirebaseIdentity};
use crate::client::{FleetApi, HttpFleetApi};
use crate::config::Config;
use crate::error::Result;
use crate::fleet::FleetService;
use crate::motorcycle::Catalog;
use crate::notify::{DispatchReport, NotificationDispatcher, Notifier, StoredNotifier};
use crate::preferences::Preferences;
use crate::storage::{SharedStorage, Storage};

/// Every service, configured.
#[derive(Debug)]
pub struct App {
    config: Config,
    preferences: Preferences,
    fleet: FleetService,
    notifier: Arc<StoredNotifier>,
}

impl App {
    /// Open the database named by `config` and connect to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the database cannot
    /// be opened or the HTTP client cannot be built.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let storage = Storage::open(config.database_path())?.into_shared();
        let api = Arc::new(HttpFleetApi::new(&config.api)?);
        info!(base_url = %api.base_url(), "fleet backend configured");
        Self::with_parts(config, storage, api)
    }

    /// Assemble the services over explicit storage and backend.
    ///
    /// # Errors
    ///
    /// Returns an error if preferences cannot be read.
    pub fn with_parts(
        config: Config,
        storage: SharedStorage,
        api: Arc<dyn FleetApi>,
    ) -> Result<Self> {
        let preferences = Preferences::load(Arc::clone(&storage))?;
        let fleet = FleetService::new(
            api,
            Arc::new(Catalog::default()),
            preferences.language(),
            config.cache.stale_time(),
        );
        let notifier = Arc::new(StoredNotifier::new(storage));
        debug!(
            language = %preferences.language(),
            notifications = preferences.notifications_enabled(),
            "app assembled"
        );
        Ok(Self {
            config,
            preferences,
            fleet,
            notifier,
        })
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fleet reads and writes.
    #[must_use]
    pub fn fleet(&self) -> &FleetService {
        &self.fleet
    }

    /// User preferences.
    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Mutable preferences.
    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.preferences
    }

    /// Local notification schedule.
    #[must_use]
    pub fn notifier(&self) -> &StoredNotifier {
        &self.notifier
    }

    /// Dispatcher honoring the current language and notification switch.
    #[must_use]
    pub fn dispatcher(&self) -> NotificationDispatcher {
        let notifier: Arc<dyn Notifier> = Arc::clone(&self.notifier) as Arc<dyn Notifier>;
        NotificationDispatcher::new(
            notifier,
            self.preferences.language(),
            self.preferences.notifications_enabled(),
        )
    }

    /// Turn everything the fleet service recorded into notifications.
    pub async fn flush_events(&self) -> DispatchReport {
        let events = self.fleet.drain_events();
        if events.is_empty() {
            return DispatchReport::default();
        }
        self.dispatcher().dispatch(events).await
    }

    /// Schedule the daily summary from fresh fleet counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the fleet list cannot be loaded.
    pub async fn schedule_daily_summary(&self) -> Result<DispatchReport> {
        let stats = self.fleet.stats().await?;
        Ok(self.dispatcher().schedule_daily_summary(&stats).await)
    }

    /// Enable or disable notifications, cancelling the schedule on disable.
    ///
    /// # Errors
    ///
    /// Returns an error if the preference or the schedule cannot be written.
    pub async fn set_notifications_enabled(&mut self, enabled: bool) -> Result<usize> {
        let notifier = Arc::clone(&self.notifier);
        self.preferences
            .set_notifications_enabled(enabled, notifier.as_ref())
            .await
    }

    /// Record this visit and return the previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the preference cannot be written.
    pub fn record_visit(&self) -> Result<Option<DateTime<Utc>>> {
        self.preferences.touch_last_visit(Utc::now())
    }

    /// Authentication against the configured identity provider.
    ///
    /// # Errors
    ///
    /// Returns an error if no identity API key is configured.
    pub fn auth(&self) -> Result<AuthService> {
        let provider = FirebaseIdentity::new(&self.config.auth, self.config.api.timeout())?;
        Ok(AuthService::new(Box::new(provider), self.preferences.clone()))
    }
}
