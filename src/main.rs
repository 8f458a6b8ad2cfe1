// src/main.rs

use clap::Parser;
use std::path::Path;
use tracing::{Level, error, info, warn};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod cnf;
mod config;
mod error;
mod service;
mod sys;
mod workflows;

use crate::cli::{Cli, Command, Invocation, UsersAction};
use crate::config::ToolConfig;
use crate::error::{Result, ToolError};
use crate::service::MariaDbOpsService;
use crate::workflows::update::UpdateOutcome;
use crate::workflows::users::{DropOutcome, UserCredentials};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // ==============================================================================
    // 1. Argument Parsing
    // ==============================================================================

    let (command, json, verbose) = match cli::resolve(Cli::try_parse()) {
        Invocation::Run { command, json, verbose } => (command, json, verbose),
        Invocation::Exit(exit) => {
            if exit.to_stderr {
                eprintln!("{}", exit.text.trim_end());
            } else {
                println!("{}", exit.text.trim_end());
            }
            std::process::exit(exit.code);
        }
    };

    // ==============================================================================
    // 2. Configuration & Logging
    // ==============================================================================

    let config = ToolConfig::load();
    init_tracing(verbose, &config.log_file);

    // ==============================================================================
    // 3. Dispatch
    // ==============================================================================

    if let Err(e) = run(config, command, json).await {
        error!("❌ {}", e);
        std::process::exit(1);
    }
}

/// Console (info → stdout, warn/error → stderr) plus an append-only
/// operation log. A log file we cannot open downgrades to console only.
fn init_tracing(verbose: u8, log_file: &Path) {
    let default_level = if verbose > 0 { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("KARI_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    let json = std::env::var("KARI_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let console = || std::io::stderr.with_max_level(Level::WARN).or_else(std::io::stdout);

    let (file, file_error) = match std::fs::OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(f) => (Some(std::sync::Mutex::new(f)), None),
        Err(e) => (None, Some(e)),
    };
    let (json_file, plain_file) = if json { (file, None) } else { (None, file) };

    tracing_subscriber::registry()
        .with(filter)
        .with((!json).then(|| fmt::layer().without_time().with_target(false).with_writer(console())))
        .with(json.then(|| fmt::layer().json().without_time().with_target(false).with_writer(console())))
        .with(plain_file.map(|w| fmt::layer().without_time().with_ansi(false).with_writer(w)))
        .with(json_file.map(|w| fmt::layer().json().without_time().with_writer(w)))
        .init();

    if let Some(e) = file_error {
        warn!("Cannot open log file {}: {}; logging to console only", log_file.display(), e);
    }
}

async fn run(config: ToolConfig, command: Command, json: bool) -> Result<()> {
    // 🛡️ Every workflow edits root-owned files or talks to systemd.
    if !nix::unistd::geteuid().is_root() {
        return Err(ToolError::InsufficientPrivileges);
    }

    let service = MariaDbOpsService::new(config)?;

    match command {
        Command::Configure => service.configure().await,
        Command::RenewSsl => service.renew_certificates().await.map(|_| ()),
        Command::InstallRenewalHook => service.install_renewal_hook().map(|_| ()),
        Command::ToggleRemote => {
            let report = service.toggle_remote_access().await?;
            if json {
                print_json(&report);
            }
            Ok(())
        }
        Command::ToggleForceSsl => {
            let report = service.toggle_force_tls().await?;
            if json {
                print_json(&report);
            }
            Ok(())
        }
        Command::Update => match service.self_update().await? {
            UpdateOutcome::AlreadyCurrent => Ok(()),
            UpdateOutcome::Replaced { backup } => {
                info!("Backup kept at {}", backup.display());
                Ok(())
            }
        },
        Command::Users(users) => run_users(&service, users.action, json).await,
    }
}

async fn run_users(service: &MariaDbOpsService, action: UsersAction, json: bool) -> Result<()> {
    let forced = action.forced();
    match action {
        UsersAction::Create { name } => {
            let creds = service.create_user(name.as_deref()).await?;
            print_credentials(&creds, json);
        }
        UsersAction::Reset { name } => {
            let creds = service.reset_user_password(name.as_deref()).await?;
            print_credentials(&creds, json);
        }
        UsersAction::Drop { name, .. } => {
            let mut stdin = std::io::stdin().lock();
            if service.drop_user(name.as_deref(), forced, &mut stdin).await? == DropOutcome::Aborted {
                println!("aborted");
            }
        }
        UsersAction::List => {
            let accounts = service.list_users().await?;
            if json {
                print_json(&accounts);
            } else {
                for a in &accounts {
                    println!("{:<32} {}", a.user, a.host);
                }
            }
        }
        UsersAction::Grants { name } => {
            let report = service.show_grants(name.as_deref()).await?;
            if json {
                print_json(&report);
            } else {
                for grant in &report.grants {
                    println!("{grant}");
                }
            }
        }
    }
    Ok(())
}

/// Straight to stdout: the password must never reach a tracing layer, and
/// therefore never the operation log.
fn print_credentials(creds: &UserCredentials, json: bool) {
    creds.secret.use_secret(|pw| {
        if json {
            print_json(&serde_json::json!({
                "user": creds.user,
                "database": creds.database,
                "password": pw,
            }));
        } else {
            println!("User:     {}", creds.user);
            println!("Database: {}", creds.database);
            println!("Password: {pw}");
            println!("Store this password now; it is not saved anywhere.");
        }
    });
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => error!("Cannot serialize report: {}", e),
    }
}
