//! Full export and destructive restore

use chrono::Utc;
use rusqlite::params;
use tracing::info;

use super::history::insert_history_rows;
use super::product_groups::insert_group_items;
use super::staff::upsert_staff_row;
use super::Database;
use crate::backup::{BackupMetadata, HistoryBackup, RestoreStats, BACKUP_FORMAT_VERSION};
use crate::error::Result;

impl Database {
    /// Snapshot history, staff and product groups
    pub fn export_backup(&self) -> Result<HistoryBackup> {
        let history = self.all_history()?;
        let staff = self.list_staff()?;
        let product_groups = self.list_product_groups()?;

        let total_records = history.len() + staff.len() + product_groups.len();

        Ok(HistoryBackup {
            metadata: BackupMetadata {
                format_version: BACKUP_FORMAT_VERSION,
                app_version: env!("CARGO_PKG_VERSION").to_string(),
                created_at: Utc::now().to_rfc3339(),
                total_records: total_records as i64,
            },
            history,
            staff,
            product_groups,
        })
    }

    /// Replace every table with the backup's contents
    ///
    /// Runs in one transaction: on error nothing changes. Irreversible on
    /// success, so callers confirm first.
    pub fn restore_backup(&self, backup: &HistoryBackup) -> Result<RestoreStats> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute_batch(
            r#"
            DELETE FROM history_records;
            DELETE FROM import_sessions;
            DELETE FROM product_group_items;
            DELETE FROM product_groups;
            DELETE FROM staff;
            "#,
        )?;

        let mut stats = RestoreStats {
            history: insert_history_rows(&tx, &backup.history)?,
            ..Default::default()
        };

        for member in &backup.staff {
            upsert_staff_row(&tx, member)?;
            stats.staff += 1;
        }

        for group in &backup.product_groups {
            tx.execute(
                "INSERT INTO product_groups (id, group_name) VALUES (?, ?)",
                params![group.id, group.group_name],
            )?;
            insert_group_items(&tx, group.id, &group.items)?;
            stats.product_groups += 1;
        }

        tx.commit()?;

        info!(
            "Restored backup: {} history, {} staff, {} groups",
            stats.history, stats.staff, stats.product_groups
        );
        Ok(stats)
    }
}
