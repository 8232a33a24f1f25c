//! Purchase history commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pointbook_core::import::{sales_reader, ImportFile, ImportQueue, StopFlag};
use pointbook_core::{AppConfig, Database};

use super::{confirm, truncate};

/// Import history files one after another; Ctrl-C stops before the next file
pub async fn cmd_history_import(
    db: &Database,
    config: &AppConfig,
    files: &[PathBuf],
    store: Option<&str>,
) -> Result<()> {
    let mut queued = Vec::with_capacity(files.len());
    for path in files {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        queued.push(ImportFile {
            name: file_name(path),
            bytes,
            store_name: store.map(str::to_string),
        });
    }

    let stop = StopFlag::new();
    let stopper = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!();
            println!("⏹  Stopping after the current file...");
            stopper.stop();
        }
    });

    let reader = sales_reader(&config.columns);
    let mut queue = ImportQueue::new(db, &reader, &config.columns, config.classification.chunk_size)
        .with_stop_flag(stop)
        .on_progress(|p| {
            println!(
                "   [{}/{}] {}: {}/{} rows",
                p.file_index + 1,
                p.file_count,
                p.file_name,
                p.rows_done,
                p.rows_total
            );
        });

    println!("📥 Importing {} file(s)...", queued.len());
    let summary = queue.run(queued).await.context("Import failed")?;

    for file in &summary.files {
        println!("   ✓ {}: {} rows", file.name, file.rows_inserted);
        if let Some(previous) = file.duplicate_of {
            println!(
                "     ⚠️  Same content as import #{}; rows were added again",
                previous
            );
        }
    }
    if summary.stopped {
        println!("   {} file(s) not imported", summary.abandoned);
    }
    println!("✅ Imported {} rows", summary.rows_inserted());

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn cmd_history_stats(db: &Database) -> Result<()> {
    let stats = db.history_stats_by_store()?;
    if stats.is_empty() {
        println!("No history records. Import with: pointbook history import FILE");
        return Ok(());
    }

    println!("{:<24} {:>10}", "STORE", "RECORDS");
    println!("{}", "-".repeat(35));
    for s in &stats {
        println!("{:<24} {:>10}", truncate(&s.store_name, 24), s.count);
    }
    println!("{}", "-".repeat(35));
    println!("{:<24} {:>10}", "Total", db.count_history()?);

    Ok(())
}

pub fn cmd_history_years(db: &Database, store: &str) -> Result<()> {
    let years = db.history_years_for_store(store)?;
    if years.is_empty() {
        println!("No records for {}", store);
    }
    for year in years {
        println!("{}", year);
    }
    Ok(())
}

pub fn cmd_history_months(db: &Database, store: &str, year: &str) -> Result<()> {
    let months = db.history_monthly_stats(store, year)?;
    if months.is_empty() {
        println!("No records for {} in {}", store, year);
        return Ok(());
    }

    println!("{:<8} {:>10}", "MONTH", "RECORDS");
    for m in months {
        println!("{}/{:<4} {:>10}", year, m.month, m.count);
    }
    Ok(())
}

pub fn cmd_history_delete(
    db: &Database,
    store: &str,
    year: Option<&str>,
    month: Option<&str>,
    yes: bool,
) -> Result<()> {
    let scope = match (year, month) {
        (Some(y), Some(m)) => format!("{} {}/{}", store, y, m),
        (Some(y), None) => format!("{} {}", store, y),
        _ => format!("all of {}", store),
    };
    if !confirm(&format!("Delete history records for {}?", scope), yes)? {
        println!("Cancelled");
        return Ok(());
    }

    let deleted = match (year, month) {
        (Some(y), Some(m)) => db.delete_history_by_store_year_month(store, y, m)?,
        (Some(y), None) => db.delete_history_by_store_year(store, y)?,
        _ => db.delete_history_by_store(store)?,
    };
    println!("🗑  Deleted {} records", deleted);
    Ok(())
}

pub fn cmd_history_clear(db: &Database, yes: bool) -> Result<()> {
    let total = db.count_history()?;
    if !confirm(
        &format!("⚠️  Delete all {} history records? This cannot be undone.", total),
        yes,
    )? {
        println!("Cancelled");
        return Ok(());
    }

    let deleted = db.clear_all()?;
    println!("🗑  Cleared {} records", deleted);
    Ok(())
}

pub fn cmd_history_browse(
    db: &Database,
    store: &str,
    year: Option<&str>,
    month: Option<&str>,
    page: i64,
    per_page: i64,
) -> Result<()> {
    let per_page = per_page.max(1);
    let offset = (page.max(1) - 1) * per_page;
    let records = db.page_history(store, year, month, offset, per_page)?;
    if records.is_empty() {
        println!("No records on page {}", page);
        return Ok(());
    }

    println!(
        "{:<9} {:<12} {:<14} {:<20} {:>5} {:<8}",
        "DATE", "CUSTOMER", "ITEM", "NAME", "QTY", "SELLER"
    );
    println!("{}", "-".repeat(72));
    for r in &records {
        println!(
            "{:<9} {:<12} {:<14} {:<20} {:>5} {:<8}",
            r.date,
            truncate(&r.customer_id, 12),
            truncate(&r.item_id, 14),
            truncate(r.item_name.as_deref().unwrap_or(""), 20),
            r.quantity,
            r.sales_person.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub fn cmd_history_log(db: &Database) -> Result<()> {
    let sessions = db.list_import_sessions()?;
    if sessions.is_empty() {
        println!("No imports yet");
        return Ok(());
    }

    println!(
        "{:>4} {:<17} {:<24} {:<12} {:>8} {:<10}",
        "ID", "IMPORTED", "FILE", "STORE", "ROWS", "STATUS"
    );
    for s in sessions {
        println!(
            "{:>4} {:<17} {:<24} {:<12} {:>8} {:<10}",
            s.id,
            s.created_at.format("%Y-%m-%d %H:%M"),
            truncate(s.filename.as_deref().unwrap_or("-"), 24),
            truncate(s.store_name.as_deref().unwrap_or("-"), 12),
            s.row_count,
            s.status.as_str()
        );
        if let Some(error) = s.error {
            println!("     {}", error);
        }
    }
    Ok(())
}
