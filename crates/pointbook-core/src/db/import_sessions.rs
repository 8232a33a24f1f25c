//! Import session log

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{ImportSession, ImportStatus};

const SESSION_COLUMNS: &str =
    "id, filename, content_hash, store_name, row_count, status, error, created_at";

impl Database {
    /// Record the start of a history file import
    pub fn create_import_session(
        &self,
        filename: Option<&str>,
        content_hash: &str,
        store_name: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO import_sessions (filename, content_hash, store_name, status)
            VALUES (?, ?, ?, ?)
            "#,
            params![
                filename,
                content_hash,
                store_name,
                ImportStatus::Processing.as_str()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn complete_import_session(&self, id: i64, row_count: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE import_sessions SET status = ?, row_count = ? WHERE id = ?",
            params![ImportStatus::Completed.as_str(), row_count, id],
        )?;
        Ok(())
    }

    /// Mark an import failed, keeping the rows committed before the failure
    pub fn fail_import_session(&self, id: i64, row_count: i64, error: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE import_sessions SET status = ?, row_count = ?, error = ? WHERE id = ?",
            params![ImportStatus::Failed.as_str(), row_count, error, id],
        )?;
        Ok(())
    }

    /// Most recent completed import of a file with this content hash
    pub fn find_import_session_by_hash(&self, content_hash: &str) -> Result<Option<ImportSession>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM import_sessions WHERE content_hash = ? AND status = ? \
             ORDER BY id DESC LIMIT 1",
            SESSION_COLUMNS
        );
        let session = conn
            .query_row(
                &sql,
                params![content_hash, ImportStatus::Completed.as_str()],
                Self::row_to_import_session,
            )
            .optional()?;
        Ok(session)
    }

    /// All import sessions, newest first
    pub fn list_import_sessions(&self) -> Result<Vec<ImportSession>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM import_sessions ORDER BY id DESC",
            SESSION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let sessions = stmt
            .query_map([], Self::row_to_import_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn row_to_import_session(row: &rusqlite::Row) -> rusqlite::Result<ImportSession> {
        let status: String = row.get(5)?;
        let created_at: String = row.get(7)?;
        Ok(ImportSession {
            id: row.get(0)?,
            filename: row.get(1)?,
            content_hash: row.get(2)?,
            store_name: row.get(3)?,
            row_count: row.get(4)?,
            status: status.parse().unwrap_or(ImportStatus::Failed),
            error: row.get(6)?,
            created_at: parse_datetime(&created_at),
        })
    }
}
