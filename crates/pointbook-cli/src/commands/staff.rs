//! Staff directory commands

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use pointbook_core::import::import_staff;
use pointbook_core::{AppConfig, CsvSpreadsheetReader, Database, Staff};

use super::truncate;

pub fn cmd_staff_list(db: &Database) -> Result<()> {
    let staff = db.list_staff()?;
    if staff.is_empty() {
        println!("No staff. Add with: pointbook staff add ID NAME --role SALES");
        return Ok(());
    }

    println!(
        "{:<8} {:<12} {:<10} {:<10} {:>8} {:>10}",
        "ID", "NAME", "ROLE", "BRANCH", "POINTS", "COSMETICS"
    );
    println!("{}", "-".repeat(63));
    for s in &staff {
        println!(
            "{:<8} {:<12} {:<10} {:<10} {:>8} {:>10}",
            s.id,
            truncate(&s.name, 12),
            s.role.label(),
            truncate(s.branch.as_deref().unwrap_or("-"), 10),
            s.points_standard.map(|v| v.to_string()).unwrap_or_default(),
            s.cosmetic_standard.map(|v| v.to_string()).unwrap_or_default()
        );
    }
    println!();
    println!("{} staff", staff.len());
    Ok(())
}

pub fn cmd_staff_add(db: &Database, staff: Staff) -> Result<()> {
    db.upsert_staff(&staff)
        .with_context(|| format!("Failed to save {}", staff.name))?;
    println!("✅ Saved {} ({}, {})", staff.name, staff.id, staff.role.label());
    Ok(())
}

pub fn cmd_staff_import(db: &Database, config: &AppConfig, path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let csv = CsvSpreadsheetReader::new().with_text_columns(config.staff_columns.text_columns());

    let count = import_staff(db, &csv, &mut reader, &config.staff_columns)
        .context("Failed to import staff list")?;
    println!("✅ Imported {} staff", count);
    Ok(())
}

pub fn cmd_staff_remove(db: &Database, id: &str) -> Result<()> {
    if db.delete_staff(id)? {
        println!("🗑  Removed staff {}", id);
    } else {
        println!("No staff with id {}", id);
    }
    Ok(())
}
