//! Portable backups of the local store
//!
//! A backup is a single JSON document holding the purchase history, the
//! staff directory and the product groups. Files ending in `.gz` are gzip
//! compressed. Restoring is destructive: every table is replaced.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{HistoryRecord, ProductGroup, Staff};

/// Current backup format version
pub const BACKUP_FORMAT_VERSION: u32 = 1;

/// Backup metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Backup format version
    pub format_version: u32,
    /// Application version that created the backup
    pub app_version: String,
    /// When the backup was created (RFC 3339)
    pub created_at: String,
    /// Total number of records in backup
    pub total_records: i64,
}

/// Full store backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryBackup {
    pub metadata: BackupMetadata,
    pub history: Vec<HistoryRecord>,
    pub staff: Vec<Staff>,
    pub product_groups: Vec<ProductGroup>,
}

/// Row counts written by a restore
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreStats {
    pub history: usize,
    pub staff: usize,
    pub product_groups: usize,
}

fn is_gzip_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Write a backup as JSON, gzip compressed when the path ends in `.gz`
pub fn write_backup_file(backup: &HistoryBackup, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);

    if is_gzip_path(path) {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        serde_json::to_writer(&mut encoder, backup)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = writer;
        serde_json::to_writer_pretty(&mut writer, backup)?;
        writer.flush()?;
    }

    info!(
        "Wrote backup {} ({} records)",
        path.display(),
        backup.metadata.total_records
    );
    Ok(())
}

/// Read a backup written by [`write_backup_file`]
pub fn read_backup_file(path: &Path) -> Result<HistoryBackup> {
    if !path.exists() {
        return Err(Error::Backup(format!("Backup not found: {}", path.display())));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut json = String::new();
    if is_gzip_path(path) {
        GzDecoder::new(reader).read_to_string(&mut json)?;
    } else {
        let mut reader = reader;
        reader.read_to_string(&mut json)?;
    }

    let backup: HistoryBackup = serde_json::from_str(&json)
        .map_err(|e| Error::Backup(format!("Invalid backup file: {}", e)))?;
    if backup.metadata.format_version > BACKUP_FORMAT_VERSION {
        return Err(Error::Backup(format!(
            "Backup format {} is newer than supported version {}",
            backup.metadata.format_version, BACKUP_FORMAT_VERSION
        )));
    }
    Ok(backup)
}
