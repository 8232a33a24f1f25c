//! Pointbook Core Library
//!
//! Staff sales bonus calculation for retail pharmacies:
//! - Persistent purchase history store with chunked bulk import
//! - Product grouping index for cross-SKU repurchase matching
//! - Repurchase resolver over durable history and the current batch
//! - Point classification and per-person aggregation
//! - Template-driven XLSX report export
//! - Staff directory, import sessions and JSON backups

pub mod aggregate;
pub mod backup;
pub mod category;
pub mod classify;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod export;
pub mod grouping;
pub mod import;
pub mod models;
pub mod points;
pub mod resolver;
pub mod rewards;
pub mod rows;
pub mod staff;

pub use aggregate::{aggregate, MatrixRow, PersonSummary, RepurchaseMatrix};
pub use backup::{read_backup_file, write_backup_file, BackupMetadata, HistoryBackup, RestoreStats};
pub use classify::{Classification, Classifier, DropReason};
pub use config::{AppConfig, ClassificationConfig, ColumnNames, StaffColumns};
pub use db::Database;
pub use error::{Error, Result};
pub use export::{
    ExportMappings, JsonTemplateLoader, ReportBuilder, ReportOptions, RoleMapping,
    SpreadsheetWriter, Templates, Workbook, XlsxWriter,
};
pub use grouping::{normalize, ProductGroupIndex};
pub use import::{ImportFile, ImportProgress, ImportQueue, ImportSummary, StopFlag};
pub use models::{
    HistoryRecord, ImportSession, ProductGroup, Staff, StaffRole, StoreStats, UNCLASSIFIED_STORE,
};
pub use points::{PointStatus, RowEdit, Stage1Row};
pub use resolver::{NoHistory, PurchaseHistory, RepurchaseResolver};
pub use rewards::{build_stage2, build_stage3, Stage2Row, Stage3Summary};
pub use rows::{CsvSpreadsheetReader, RawRow, RawValue, SpreadsheetReader};
pub use staff::StaffDirectory;
