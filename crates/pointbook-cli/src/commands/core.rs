//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Config resolution (override file or embedded default)
//! - `confirm` - Yes/no gate for destructive commands
//! - `cmd_init` - Initialize the database

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use pointbook_core::config::default_config_path;
use pointbook_core::{AppConfig, Database};

/// Open (and migrate) the database
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    Database::new(path_str).context("Failed to open database")
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    AppConfig::load(path).context("Failed to load configuration")
}

/// Ask a yes/no question on stdin; `yes` skips the prompt
pub fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    confirm_from(prompt, &mut io::stdin().lock())
}

pub(crate) fn confirm_from(prompt: &str, input: &mut dyn BufRead) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;
    let records = db.count_history()?;
    let staff = db.list_staff()?.len();
    println!("   History records: {}", records);
    println!("   Staff: {}", staff);

    match default_config_path() {
        Some(path) if path.exists() => println!("   Config: {}", path.display()),
        Some(path) => println!("   Config: built-in defaults ({} not found)", path.display()),
        None => println!("   Config: built-in defaults"),
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Load staff: pointbook staff import staff.csv");
    println!("  2. Import history: pointbook history import sales.csv --store 中山店");
    println!("  3. Compute bonuses: pointbook compute --file april.csv --output april.xlsx");

    Ok(())
}
