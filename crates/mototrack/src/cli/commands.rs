//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::i18n::Language;
use crate::motorcycle::{MotorcycleId, MotorcycleStatus};
use crate::preferences::Theme;

/// Motorcycle status as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Ready to be rented
    Available,
    /// Out with a rider
    InUse,
    /// In the workshop
    Maintenance,
    /// Held for a rental
    Reserved,
}

impl From<StatusArg> for MotorcycleStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Available => Self::Available,
            StatusArg::InUse => Self::InUse,
            StatusArg::Maintenance => Self::Maintenance,
            StatusArg::Reserved => Self::Reserved,
        }
    }
}

/// Theme as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    /// Light background
    Light,
    /// Dark background
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => Self::Light,
            ThemeArg::Dark => Self::Dark,
        }
    }
}

/// Language as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LanguageArg {
    /// Portuguese
    Pt,
    /// Spanish
    Es,
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::Pt => Self::Pt,
            LanguageArg::Es => Self::Es,
        }
    }
}

/// Motorcycle commands.
#[derive(Debug, Subcommand)]
pub enum MotoCommand {
    /// List motorcycles
    List(ListCommand),

    /// Show one motorcycle
    Show {
        /// Motorcycle id
        id: MotorcycleId,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Register a motorcycle
    Add(AddCommand),

    /// Edit a motorcycle
    Update(UpdateCommand),

    /// Change the status of a motorcycle
    Status {
        /// Motorcycle id
        id: MotorcycleId,

        /// New status
        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Remove a motorcycle
    Delete {
        /// Motorcycle id
        id: MotorcycleId,
    },
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only motorcycles whose model, plate or branch contains this text
    #[arg(short, long)]
    pub search: Option<String>,

    /// Only motorcycles with this status
    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,

    /// Print counts per status instead of the list
    #[arg(long)]
    pub stats: bool,

    /// Bypass the cache and reload from the backend
    #[arg(short, long)]
    pub refresh: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Add command arguments.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Identifier to use; the backend assigns one when omitted
    #[arg(long)]
    pub id: Option<MotorcycleId>,

    /// Model id
    #[arg(short, long)]
    pub model: i64,

    /// Branch id
    #[arg(short, long)]
    pub branch: i64,

    /// License plate (ABC1234, ABC-1234 or ABC1D23)
    #[arg(short, long)]
    pub plate: String,

    /// Initial status
    #[arg(long, value_enum, default_value = "available")]
    pub status: StatusArg,

    /// Odometer reading in km
    #[arg(short, long, default_value = "0")]
    pub km: u32,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,

    /// Model year
    #[arg(long)]
    pub year: Option<u16>,

    /// Paint color
    #[arg(long)]
    pub color: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Update command arguments. Omitted fields keep their current value.
#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Motorcycle id
    pub id: MotorcycleId,

    /// Model id
    #[arg(short, long)]
    pub model: Option<i64>,

    /// Branch id
    #[arg(short, long)]
    pub branch: Option<i64>,

    /// License plate
    #[arg(short, long)]
    pub plate: Option<String>,

    /// Odometer reading in km
    #[arg(short, long)]
    pub km: Option<u32>,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,

    /// Model year
    #[arg(long)]
    pub year: Option<u16>,

    /// Paint color
    #[arg(long)]
    pub color: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Branch commands.
#[derive(Debug, Subcommand)]
pub enum BranchCommand {
    /// List branches
    List {
        /// Ask the backend instead of the built-in catalog
        #[arg(short, long)]
        remote: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one branch from the backend
    Show {
        /// Branch id
        id: i64,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Create a branch
    Add {
        /// Branch name
        name: String,
    },

    /// Rename a branch
    Rename {
        /// Branch id
        id: i64,

        /// New name
        name: String,
    },

    /// Remove a branch
    Delete {
        /// Branch id
        id: i64,
    },
}

/// Account commands.
#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in
    Login {
        /// Account email
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },

    /// Create an account and sign in
    Register {
        /// Account email
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Password again
        #[arg(long)]
        confirm: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Preference commands.
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show all preferences
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Set the theme, or toggle it when no value is given
    Theme {
        /// Theme to use
        #[arg(value_enum)]
        theme: Option<ThemeArg>,
    },

    /// Set the display language
    Language {
        /// Language to use
        #[arg(value_enum)]
        language: LanguageArg,
    },
}

/// Local notification commands.
#[derive(Debug, Subcommand)]
pub enum NotificationsCommand {
    /// Show recent notifications
    List {
        /// Maximum number of entries
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Deliver notifications whose time has come
    Due {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Turn notifications on
    Enable,

    /// Turn notifications off and cancel everything scheduled
    Disable,

    /// Delete the notification history
    Clear,

    /// Schedule the daily fleet summary
    Summary,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print the default configuration file path
    Path,

    /// Validate a configuration file
    Validate {
        /// File to validate (defaults to the standard location)
        file: Option<PathBuf>,
    },
}
