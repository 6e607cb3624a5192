mod cli;
mod config;
mod db;
mod location;
mod models;
mod prayer_times;
mod reminders;
mod streak;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;

use cli::args::{Cli, Commands};
use cli::handlers;
use config::AppConfig;
use db::migrations::run_migrations;
use db::repository::MetaRepo;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = AppConfig::load().context("Loading config")?;

    // Explicit storage lifecycle: open once, migrate, then serve commands.
    AppConfig::ensure_data_dir()?;
    let db_path = AppConfig::db_path()?;
    let conn = Connection::open(&db_path)
        .with_context(|| format!("Opening database at {:?}", db_path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    run_migrations(&conn)?;

    match cli.command {
        // Setup wizard
        Some(Commands::Setup { reset }) => {
            handlers::handle_setup(&conn, &mut config, reset)?;
        }

        // Explicit subcommands — check setup first
        Some(cmd) => {
            ensure_setup(&conn, &mut config)?;
            match cmd {
                Commands::Log { prayer, date, undo } => {
                    handlers::handle_log(&conn, &prayer, date.as_deref(), undo)?;
                }
                Commands::Day { date } => {
                    handlers::handle_day(&conn, date.as_deref())?;
                }
                Commands::Calendar { month } => {
                    handlers::handle_calendar(&conn, month.as_deref())?;
                }
                Commands::Streaks => {
                    handlers::handle_streaks(&conn)?;
                }
                Commands::Stats { week } => {
                    handlers::handle_stats(&conn, week)?;
                }
                Commands::Times => {
                    handlers::handle_times(&conn, &config)?;
                }
                Commands::Remind { action } => {
                    handlers::handle_remind(&conn, &config, &action)?;
                }
                Commands::Export { json } => {
                    handlers::handle_export(&conn, &config, json)?;
                }
                Commands::Setup { .. } => unreachable!(),
            }
        }

        // No subcommand → today's overview
        None => {
            ensure_setup(&conn, &mut config)?;
            handlers::handle_overview(&conn, &config)?;
        }
    }

    Ok(())
}

/// Check if setup has been done; if not, run the wizard automatically.
fn ensure_setup(conn: &Connection, config: &mut AppConfig) -> Result<()> {
    let done = MetaRepo::get(conn, "setup_done")?;
    if done.as_deref() != Some("1") {
        eprintln!("No configuration found. Running setup...");
        eprintln!();
        handlers::handle_setup(conn, config, false)?;
    }
    Ok(())
}
