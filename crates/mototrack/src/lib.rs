//! `mototrack` - Fleet client for a motorcycle yard
//!
//! This library talks to the fleet REST backend, caches what it reads,
//! keeps device-local preferences in `SQLite` and turns fleet changes into
//! local notifications such as maintenance reminders.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod app;
pub mod auth;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod fleet;
pub mod i18n;
pub mod logging;
pub mod motorcycle;
pub mod notify;
pub mod outbox;
pub mod preferences;
pub mod storage;
pub mod validation;
pub mod wire;

#[cfg(test)]
mod testing;

pub use app::App;
pub use auth::{AuthService, IdentityProvider, Session, User};
pub use cache::{QueryCache, QueryKey, QueryStatus};
pub use client::{FleetApi, HttpFleetApi};
pub use config::Config;
pub use error::{Error, Result};
pub use fleet::FleetService;
pub use i18n::Language;
pub use logging::init_logging;
pub use motorcycle::{
    Branch, Catalog, FleetStats, Model, Motorcycle, MotorcycleId, MotorcycleStatus, NewMotorcycle,
};
pub use notify::{Notification, NotificationDispatcher, Notifier, StoredNotifier};
pub use outbox::FleetEvent;
pub use preferences::{Preferences, Theme};
pub use storage::Storage;
