//! Pointbook CLI - Staff sales bonus calculator
//!
//! Usage:
//!   pointbook init                                  Initialize database
//!   pointbook history import march.csv --store 中山店  Import purchase history
//!   pointbook staff import staff.csv                Load the staff directory
//!   pointbook compute --file april.csv --output april.xlsx

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::History { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                HistoryAction::Import { files, store } => {
                    let config = commands::load_config(cli.config.as_deref())?;
                    commands::cmd_history_import(&db, &config, &files, store.as_deref()).await
                }
                HistoryAction::Stats => commands::cmd_history_stats(&db),
                HistoryAction::Years { store } => commands::cmd_history_years(&db, &store),
                HistoryAction::Months { store, year } => {
                    commands::cmd_history_months(&db, &store, &year)
                }
                HistoryAction::Delete {
                    store,
                    year,
                    month,
                    yes,
                } => commands::cmd_history_delete(
                    &db,
                    &store,
                    year.as_deref(),
                    month.as_deref(),
                    yes,
                ),
                HistoryAction::Clear { yes } => commands::cmd_history_clear(&db, yes),
                HistoryAction::Browse {
                    store,
                    year,
                    month,
                    page,
                    per_page,
                } => commands::cmd_history_browse(
                    &db,
                    &store,
                    year.as_deref(),
                    month.as_deref(),
                    page,
                    per_page,
                ),
                HistoryAction::Log => commands::cmd_history_log(&db),
            }
        }
        Commands::Staff { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(StaffAction::List) => commands::cmd_staff_list(&db),
                Some(StaffAction::Add {
                    id,
                    name,
                    role,
                    branch,
                    customer_id,
                    points_standard,
                    cosmetic_standard,
                }) => {
                    let role = role.parse().map_err(|e: String| anyhow::anyhow!(e))?;
                    commands::cmd_staff_add(
                        &db,
                        pointbook_core::Staff {
                            id,
                            name,
                            role,
                            branch,
                            customer_id,
                            points_standard,
                            cosmetic_standard,
                        },
                    )
                }
                Some(StaffAction::Import { file }) => {
                    let config = commands::load_config(cli.config.as_deref())?;
                    commands::cmd_staff_import(&db, &config, &file)
                }
                Some(StaffAction::Remove { id }) => commands::cmd_staff_remove(&db, &id),
            }
        }
        Commands::Groups { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(GroupsAction::List) => commands::cmd_groups_list(&db),
                Some(GroupsAction::Add { name, items }) => {
                    commands::cmd_groups_add(&db, &name, &items)
                }
                Some(GroupsAction::Update { id, name, items }) => {
                    commands::cmd_groups_update(&db, id, &name, &items)
                }
                Some(GroupsAction::Remove { id }) => commands::cmd_groups_remove(&db, id),
            }
        }
        Commands::Compute(args) => {
            let db = commands::open_db(&cli.db)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_compute(&db, &config, &args)
        }
        Commands::Backup { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                BackupAction::Export { output } => commands::cmd_backup_export(&db, &output),
                BackupAction::Restore { file, yes } => {
                    commands::cmd_backup_restore(&db, &file, yes)
                }
            }
        }
    }
}
