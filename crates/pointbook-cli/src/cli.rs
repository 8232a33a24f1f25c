//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Pointbook - Staff sales bonus calculator
#[derive(Parser)]
#[command(name = "pointbook")]
#[command(about = "Staff sales bonus calculator for retail pharmacies", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "pointbook.db", global = true)]
    pub db: PathBuf,

    /// Config override (defaults to ~/.local/share/pointbook/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage the purchase history store
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Manage the staff directory
    Staff {
        #[command(subcommand)]
        action: Option<StaffAction>,
    },

    /// Manage product groups used for repurchase matching
    Groups {
        #[command(subcommand)]
        action: Option<GroupsAction>,
    },

    /// Classify a sales export and write the bonus report
    Compute(ComputeArgs),

    /// Export or restore a full backup
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Import sales exports into the history store
    Import {
        /// CSV files, imported in the given order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Store to file the rows under (otherwise read from the store column)
        #[arg(short, long)]
        store: Option<String>,
    },

    /// Record counts per store
    Stats,

    /// ROC years present for a store
    Years {
        /// Store name ("(未分類)" for records without a store)
        store: String,
    },

    /// Record counts per month of one year
    Months {
        store: String,
        /// ROC year, e.g. 113
        year: String,
    },

    /// Delete a store's records, optionally one year or month only
    Delete {
        store: String,

        #[arg(long)]
        year: Option<String>,

        /// Requires --year
        #[arg(long, requires = "year")]
        month: Option<String>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete every history record and import log entry
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Page through a store's records
    Browse {
        store: String,

        #[arg(long)]
        year: Option<String>,

        #[arg(long, requires = "year")]
        month: Option<String>,

        /// One-based page number
        #[arg(long, default_value = "1")]
        page: i64,

        #[arg(long, default_value = "50")]
        per_page: i64,
    },

    /// Show the import log
    Log,
}

#[derive(Subcommand)]
pub enum StaffAction {
    /// List staff (default)
    List,

    /// Add or update a staff member
    Add {
        /// Employee number
        id: String,

        /// Name as it appears in the sales export
        name: String,

        /// SALES, PHARMACIST or NO_BONUS (Chinese titles accepted)
        #[arg(short, long, default_value = "SALES")]
        role: String,

        #[arg(long)]
        branch: Option<String>,

        /// Customer id used for the employee's own purchases
        #[arg(long)]
        customer_id: Option<String>,

        #[arg(long)]
        points_standard: Option<f64>,

        #[arg(long)]
        cosmetic_standard: Option<f64>,
    },

    /// Import a staff list (CSV)
    Import {
        file: PathBuf,
    },

    /// Remove a staff member by employee number
    Remove {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum GroupsAction {
    /// List product groups (default)
    List,

    /// Create a group
    Add {
        /// Group name
        name: String,

        /// Item ids, optionally with an alias: 00123 or 00123=新包裝
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Replace a group's name and items
    Update {
        id: i64,

        name: String,

        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Delete a group
    Remove {
        id: i64,
    },
}

#[derive(Args)]
pub struct ComputeArgs {
    /// Sales export (CSV)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Report to write (.xlsx)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Only export these people (repeat or comma separate)
    #[arg(long, value_delimiter = ',')]
    pub staff: Vec<String>,

    /// Row edits to apply before aggregation (JSON)
    #[arg(long)]
    pub edits: Option<PathBuf>,

    /// Store clerk report template (JSON sheet)
    #[arg(long)]
    pub sales_template: Option<PathBuf>,

    /// Pharmacist report template (JSON sheet)
    #[arg(long)]
    pub pharmacist_template: Option<PathBuf>,

    /// Period label printed on every sheet, e.g. 113/03
    #[arg(long)]
    pub period: Option<String>,

    /// Also print the classified rows as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum BackupAction {
    /// Write history, staff and groups to a JSON file (.gz to compress)
    Export {
        output: PathBuf,
    },

    /// Replace the whole store with a backup
    Restore {
        file: PathBuf,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
