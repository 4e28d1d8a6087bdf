//! Command-line interface for mototrack.
//!
//! This module provides the CLI structure for the `motoctl` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, AuthCommand, BranchCommand, ConfigCommand, LanguageArg, ListCommand, MotoCommand,
    NotificationsCommand, SettingsCommand, StatusArg, ThemeArg, UpdateCommand,
};

/// motoctl - Manage the motorcycle fleet
///
/// Lists and edits motorcycles and branches on the fleet backend, keeps
/// local preferences and schedules maintenance reminders.
#[derive(Debug, Parser)]
#[command(name = "motoctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Work with motorcycles
    #[command(subcommand)]
    Moto(MotoCommand),

    /// Work with branches
    #[command(subcommand)]
    Branch(BranchCommand),

    /// Sign in and out
    #[command(subcommand)]
    Auth(AuthCommand),

    /// View or change preferences
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Inspect and control local notifications
    #[command(subcommand)]
    Notifications(NotificationsCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}
