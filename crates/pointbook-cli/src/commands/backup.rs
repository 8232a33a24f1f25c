//! Backup export and restore commands

use std::path::Path;

use anyhow::{Context, Result};
use pointbook_core::{read_backup_file, write_backup_file, Database};

use super::confirm;

/// Write history, staff and product groups to a JSON file
pub fn cmd_backup_export(db: &Database, output: &Path) -> Result<()> {
    println!("Creating backup...");

    let backup = db.export_backup().context("Failed to read the store")?;
    write_backup_file(&backup, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✅ Backup written: {}", output.display());
    println!("   History records: {}", backup.history.len());
    println!("   Staff: {}", backup.staff.len());
    println!("   Product groups: {}", backup.product_groups.len());
    if output.extension().is_some_and(|e| e == "gz") {
        println!("   📦 Compressed");
    }

    Ok(())
}

/// Replace the store contents with a backup
pub fn cmd_backup_restore(db: &Database, file: &Path, yes: bool) -> Result<()> {
    let backup = read_backup_file(file)
        .with_context(|| format!("Failed to read backup {}", file.display()))?;

    println!(
        "Backup from {} (format v{}): {} history records",
        backup.metadata.created_at, backup.metadata.format_version, backup.metadata.total_records
    );
    if !confirm(
        "⚠️  This replaces all history, staff and product groups. Continue?",
        yes,
    )? {
        println!("Cancelled");
        return Ok(());
    }

    let stats = db.restore_backup(&backup).context("Failed to restore backup")?;

    println!("✅ Restored from {}", file.display());
    println!("   History records: {}", stats.history);
    println!("   Staff: {}", stats.staff);
    println!("   Product groups: {}", stats.product_groups);

    Ok(())
}
