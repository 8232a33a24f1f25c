//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `history` - Purchase history store (bulk insert, stats, deletes, lookups)
//! - `staff` - Staff directory
//! - `product_groups` - Product groups used for repurchase matching
//! - `import_sessions` - Imported history file log
//! - `backup` - Full export and destructive restore

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod backup;
mod history;
mod import_sessions;
mod product_groups;
mod staff;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (or create) the database at `path` and run migrations
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(8).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create an isolated throwaway database (for testing)
    ///
    /// Uses a unique temporary file rather than `:memory:` so every pooled
    /// connection sees the same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "pointbook_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path.to_string_lossy())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Delete every history record and import session
    ///
    /// Staff and product groups are kept. Irreversible: callers confirm first.
    pub fn clear_all(&self) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM history_records", [])?;
        tx.execute("DELETE FROM import_sessions", [])?;
        tx.commit()?;

        info!("Cleared {} history records", deleted);
        Ok(deleted)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the import writer
            PRAGMA journal_mode = WAL;
            PRAGMA cache_size = 2000;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Purchase history (append-mostly, never updated in place)
            CREATE TABLE IF NOT EXISTS history_records (
                id INTEGER PRIMARY KEY,
                customer_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                item_id_normalized TEXT NOT NULL,   -- leading zeros stripped
                date TEXT NOT NULL,                 -- YYYY-MM-DD or ROC YYYMMDD
                quantity INTEGER NOT NULL,          -- negative for returns
                store_name TEXT,                    -- NULL for legacy imports
                sales_person TEXT,
                price REAL,
                unit TEXT,
                item_name TEXT,
                amount REAL,
                category TEXT,
                points REAL,
                ticket_no TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_history_customer ON history_records(customer_id);
            CREATE INDEX IF NOT EXISTS idx_history_item ON history_records(item_id);
            CREATE INDEX IF NOT EXISTS idx_history_customer_item
                ON history_records(customer_id, item_id_normalized);
            CREATE INDEX IF NOT EXISTS idx_history_store_date ON history_records(store_name, date);

            -- Staff directory
            CREATE TABLE IF NOT EXISTS staff (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL DEFAULT 'SALES',
                branch TEXT,
                customer_id TEXT,
                points_standard REAL,
                cosmetic_standard REAL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Product groups (interchangeable item codes)
            CREATE TABLE IF NOT EXISTS product_groups (
                id INTEGER PRIMARY KEY,
                group_name TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS product_group_items (
                id INTEGER PRIMARY KEY,
                group_id INTEGER NOT NULL REFERENCES product_groups(id) ON DELETE CASCADE,
                item_id TEXT NOT NULL,
                item_id_normalized TEXT NOT NULL,
                alias TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_group_items_group ON product_group_items(group_id);
            CREATE INDEX IF NOT EXISTS idx_group_items_normalized
                ON product_group_items(item_id_normalized);

            -- Imported history files
            CREATE TABLE IF NOT EXISTS import_sessions (
                id INTEGER PRIMARY KEY,
                filename TEXT,
                content_hash TEXT NOT NULL,
                store_name TEXT,
                row_count INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'processing',
                error TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_import_sessions_hash ON import_sessions(content_hash);
            "#,
        )?;

        info!("Database migrations complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
