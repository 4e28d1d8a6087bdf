//! `motoctl` - CLI for mototrack
//!
//! This binary provides the command-line interface for browsing and editing
//! the motorcycle fleet, managing preferences and local notifications.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::info;

use mototrack::auth::Session;
use mototrack::cli::{
    AddCommand, AuthCommand, BranchCommand, Cli, Command, ConfigCommand, ListCommand, MotoCommand,
    NotificationsCommand, SettingsCommand, UpdateCommand,
};
use mototrack::i18n::Language;
use mototrack::notify::{remaining_km, should_remind, DispatchReport};
use mototrack::preferences::keys;
use mototrack::{init_logging, App, Config, Error, FleetStats, Motorcycle, NewMotorcycle};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let mut language = Language::default();
    match run(cli, &mut language).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, language);
            ExitCode::FAILURE
        }
    }
}

fn report_error(err: &anyhow::Error, language: Language) {
    match err.downcast_ref::<Error>() {
        Some(Error::Validation(errors)) => {
            eprintln!("error: invalid input");
            for field in errors.iter() {
                eprintln!("  {}: {}", field.field, field.message);
            }
        }
        Some(err) => eprintln!("error: {}", language.messages().describe_error(err)),
        None => eprintln!("error: {err:#}"),
    }
}

async fn run(cli: Cli, language: &mut Language) -> anyhow::Result<()> {
    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Config(cmd) => handle_config(&config, cmd),
        Command::Moto(cmd) => {
            let app = open_app(config, language)?;
            handle_moto(&app, cmd).await
        }
        Command::Branch(cmd) => {
            let app = open_app(config, language)?;
            handle_branch(&app, cmd).await
        }
        Command::Auth(cmd) => {
            let app = open_app(config, language)?;
            handle_auth(&app, cmd).await
        }
        Command::Settings(cmd) => {
            let mut app = open_app(config, language)?;
            handle_settings(&mut app, cmd)
        }
        Command::Notifications(cmd) => {
            let mut app = open_app(config, language)?;
            handle_notifications(&mut app, cmd).await
        }
    }
}

fn open_app(config: Config, language: &mut Language) -> anyhow::Result<App> {
    let app = App::open(config)?;
    *language = app.preferences().language();
    if let Some(previous) = app.record_visit()? {
        info!(%previous, "welcome back");
    }
    Ok(app)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn flush(app: &App) {
    let report = app.flush_events().await;
    log_report(&report);
}

fn log_report(report: &DispatchReport) {
    if report.scheduled + report.failed + report.skipped > 0 {
        info!(
            scheduled = report.scheduled,
            failed = report.failed,
            skipped = report.skipped,
            "notifications dispatched"
        );
    }
}

fn status_text(app: &App, motorcycle: &Motorcycle) -> &'static str {
    app.preferences()
        .language()
        .messages()
        .status_label(motorcycle.status)
}

fn print_motorcycle(app: &App, m: &Motorcycle) {
    println!("Motorcycle #{}", m.id);
    println!("  Model:     {} ({})", m.model_name, m.model_id);
    println!("  Branch:    {} ({})", m.branch_name, m.branch_id);
    println!("  Plate:     {}", m.plate);
    println!("  Status:    {} {}", m.status.emoji(), status_text(app, m));
    println!("  Mileage:   {} km", m.mileage);
    println!("  Service:   in {} km", remaining_km(m.mileage));
    println!("  Position:  {}-{}", m.position.row, m.position.spot);
    if let Some(year) = m.year {
        println!("  Year:      {year}");
    }
    if let Some(color) = &m.color {
        println!("  Color:     {color}");
    }
    if let Some(notes) = &m.notes {
        println!("  Notes:     {notes}");
    }
}

fn print_stats(stats: &FleetStats) {
    println!("Total:        {}", stats.total);
    println!("Available:    {}", stats.available);
    println!("In use:       {}", stats.in_use);
    println!("Maintenance:  {}", stats.maintenance);
    println!("Reserved:     {}", stats.reserved);
}

async fn handle_moto(app: &App, cmd: MotoCommand) -> anyhow::Result<()> {
    let fleet = app.fleet();
    match cmd {
        MotoCommand::List(list) => handle_list(app, list).await?,
        MotoCommand::Show { id, json } => {
            let motorcycle = fleet.motorcycle(id).await?;
            if json {
                print_json(&motorcycle)?;
            } else {
                print_motorcycle(app, &motorcycle);
            }
        }
        MotoCommand::Add(add) => handle_add(app, add).await?,
        MotoCommand::Update(update) => handle_update(app, update).await?,
        MotoCommand::Status { id, status } => {
            let updated = fleet.set_status(id, status.into()).await?;
            flush(app).await;
            println!(
                "Motorcycle #{} is now {}",
                updated.id,
                status_text(app, &updated)
            );
        }
        MotoCommand::Delete { id } => {
            fleet.delete(id).await?;
            flush(app).await;
            println!("Deleted motorcycle #{id}");
        }
    }
    Ok(())
}

async fn handle_list(app: &App, list: ListCommand) -> anyhow::Result<()> {
    let fleet = app.fleet();
    if list.refresh {
        fleet.refetch().await?;
    }
    let motorcycles = fleet
        .search(
            list.search.as_deref().unwrap_or_default(),
            list.status.map(Into::into),
        )
        .await?;

    if list.stats {
        let stats = FleetStats::from_motorcycles(&motorcycles);
        return if list.json {
            print_json(&stats)
        } else {
            print_stats(&stats);
            Ok(())
        };
    }

    if list.json {
        return print_json(&motorcycles);
    }
    if motorcycles.is_empty() {
        println!("No motorcycles found.");
        return Ok(());
    }
    println!(
        "{:>6}  {:<20} {:<9} {:<14} {:>9}  {}",
        "ID", "MODEL", "PLATE", "STATUS", "KM", "BRANCH"
    );
    for m in &motorcycles {
        let marker = if should_remind(m.mileage) { " *" } else { "" };
        println!(
            "{:>6}  {:<20} {:<9} {:<14} {:>9}  {}{marker}",
            m.id,
            m.model_name,
            m.plate,
            status_text(app, m),
            m.mileage,
            m.branch_name
        );
    }
    if motorcycles.iter().any(|m| should_remind(m.mileage)) {
        println!();
        println!("* maintenance due soon");
    }
    Ok(())
}

async fn handle_add(app: &App, add: AddCommand) -> anyhow::Result<()> {
    let draft = NewMotorcycle {
        id: add.id,
        model_id: add.model,
        branch_id: add.branch,
        plate: add.plate,
        status: add.status.into(),
        mileage: add.km,
        notes: add.notes,
        year: add.year,
        color: add.color,
    };
    let created = app.fleet().add(&draft).await?;
    flush(app).await;
    if add.json {
        print_json(&created)
    } else {
        println!("Added motorcycle #{} ({})", created.id, created.plate);
        Ok(())
    }
}

async fn handle_update(app: &App, update: UpdateCommand) -> anyhow::Result<()> {
    let fleet = app.fleet();
    let mut motorcycle = fleet.motorcycle(update.id).await?;
    if let Some(model) = update.model {
        motorcycle.model_id = model;
    }
    if let Some(branch) = update.branch {
        motorcycle.branch_id = branch;
    }
    if let Some(plate) = update.plate {
        motorcycle.plate = plate;
    }
    if let Some(km) = update.km {
        motorcycle.mileage = km;
    }
    if update.notes.is_some() {
        motorcycle.notes = update.notes;
    }
    if update.year.is_some() {
        motorcycle.year = update.year;
    }
    if update.color.is_some() {
        motorcycle.color = update.color;
    }

    let saved = fleet.update(&motorcycle).await?;
    flush(app).await;
    if update.json {
        print_json(&saved)
    } else {
        println!("Updated motorcycle #{}", saved.id);
        Ok(())
    }
}

async fn handle_branch(app: &App, cmd: BranchCommand) -> anyhow::Result<()> {
    let fleet = app.fleet();
    match cmd {
        BranchCommand::List { remote, json } => {
            let branches = if remote {
                fleet.remote_branches().await?
            } else {
                fleet.branches().to_vec()
            };
            if json {
                print_json(&branches)?;
            } else {
                for branch in &branches {
                    println!("{:>6}  {}", branch.id, branch.name);
                }
            }
        }
        BranchCommand::Show { id, json } => {
            let branch = fleet.branch(id).await?;
            if json {
                print_json(&branch)?;
            } else {
                println!("Branch #{}: {}", branch.id, branch.name);
            }
        }
        BranchCommand::Add { name } => {
            let branch = fleet.add_branch(&name).await?;
            println!("Added branch #{} ({})", branch.id, branch.name);
        }
        BranchCommand::Rename { id, name } => {
            let branch = fleet.rename_branch(id, &name).await?;
            println!("Branch #{} renamed to {}", branch.id, branch.name);
        }
        BranchCommand::Delete { id } => {
            fleet.delete_branch(id).await?;
            println!("Deleted branch #{id}");
        }
    }
    Ok(())
}

async fn handle_auth(app: &App, cmd: AuthCommand) -> anyhow::Result<()> {
    match cmd {
        AuthCommand::Login { email, password } => {
            let user = app.auth()?.login(&email, &password).await?;
            println!("Signed in as {}", user.email);
        }
        AuthCommand::Register {
            email,
            password,
            confirm,
        } => {
            let user = app.auth()?.register(&email, &password, &confirm).await?;
            println!("Account created for {}", user.email);
        }
        AuthCommand::Logout => {
            app.auth()?.logout().await?;
            println!("Signed out.");
        }
        AuthCommand::Whoami { json } => {
            let session: Option<Session> = app.preferences().load_json(keys::SESSION)?;
            let user = session.map(|s| s.user).ok_or(Error::NotAuthenticated)?;
            if json {
                print_json(&user)?;
            } else {
                println!("{} ({})", user.email, user.uid);
            }
        }
    }
    Ok(())
}

fn handle_settings(app: &mut App, cmd: SettingsCommand) -> anyhow::Result<()> {
    match cmd {
        SettingsCommand::Show { json } => {
            let prefs = app.preferences();
            let last_visit = prefs.last_visit()?;
            let push_token = prefs.push_token()?;
            let session: Option<Session> = prefs.load_json(keys::SESSION)?;
            if json {
                print_json(&serde_json::json!({
                    "theme": prefs.theme(),
                    "language": prefs.language(),
                    "notifications_enabled": prefs.notifications_enabled(),
                    "last_visit": last_visit,
                    "push_token": push_token,
                    "user": session.map(|s| s.user),
                }))?;
            } else {
                println!("Theme:          {}", prefs.theme());
                println!("Language:       {}", prefs.language());
                println!("Notifications:  {}", prefs.notifications_enabled());
                println!(
                    "Last visit:     {}",
                    last_visit.map_or_else(|| "never".to_string(), |at| at.to_rfc3339())
                );
                println!(
                    "Signed in as:   {}",
                    session.map_or_else(|| "nobody".to_string(), |s| s.user.email)
                );
            }
        }
        SettingsCommand::Theme { theme } => {
            let prefs = app.preferences_mut();
            let theme = match theme {
                Some(theme) => {
                    prefs.set_theme(theme.into())?;
                    prefs.theme()
                }
                None => prefs.toggle_theme()?,
            };
            println!("Theme: {theme}");
        }
        SettingsCommand::Language { language } => {
            app.preferences_mut().set_language(language.into())?;
            println!("Language: {}", app.preferences().language());
        }
    }
    Ok(())
}

async fn handle_notifications(app: &mut App, cmd: NotificationsCommand) -> anyhow::Result<()> {
    match cmd {
        NotificationsCommand::List { limit, json } => {
            let recent = app.notifier().recent(limit)?;
            if json {
                print_json(&recent)?;
            } else if recent.is_empty() {
                println!("No notifications.");
            } else {
                for entry in &recent {
                    let state = if entry.delivered_at.is_some() {
                        "delivered"
                    } else {
                        "pending"
                    };
                    println!(
                        "{:>5}  {:<10} {:<25}  {}",
                        entry.id,
                        state,
                        entry.fire_at.to_rfc3339(),
                        entry.notification.title
                    );
                }
            }
        }
        NotificationsCommand::Due { json } => {
            let due = app.notifier().take_due(Utc::now())?;
            if json {
                print_json(&due)?;
            } else {
                for entry in &due {
                    println!("{}", entry.notification.title);
                    println!("  {}", entry.notification.body);
                    if let Some(link) = entry.notification.deep_link() {
                        println!("  -> {link}");
                    }
                }
            }
        }
        NotificationsCommand::Enable => {
            app.set_notifications_enabled(true).await?;
            println!("Notifications enabled.");
        }
        NotificationsCommand::Disable => {
            let cancelled = app.set_notifications_enabled(false).await?;
            println!("Notifications disabled ({cancelled} cancelled).");
        }
        NotificationsCommand::Clear => {
            let removed = app.notifier().clear_history()?;
            println!("Removed {removed} notifications.");
        }
        NotificationsCommand::Summary => {
            let report = app.schedule_daily_summary().await?;
            log_report(&report);
            if report.scheduled > 0 {
                println!("Daily summary scheduled.");
            } else {
                println!("Notifications are disabled; nothing scheduled.");
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let mut shown = config.clone();
            if shown.auth.api_key.is_some() {
                shown.auth.api_key = Some("***".to_string());
            }
            if json {
                print_json(&shown)?;
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[API]");
                println!("  Base URL:           {}", shown.api.base_url);
                println!("  Timeout (secs):     {}", shown.api.timeout_secs);
                println!();
                println!("[Cache]");
                println!("  Stale time (secs):  {}", shown.cache.stale_time_secs);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", shown.database_path().display());
                println!();
                println!("[Auth]");
                println!("  Endpoint:           {}", shown.auth.endpoint);
                println!(
                    "  API key:            {}",
                    if shown.auth.api_key.is_some() { "set" } else { "not set" }
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path.clone()))
                .with_context(|| format!("configuration at {} is invalid", path.display()))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
