//! Purchase history and staff imports
//!
//! History files are queued and imported one at a time. Each file is
//! inserted in chunks of `chunk_size` rows; every chunk is committed on its
//! own and the task yields to the runtime before the next one, so a long
//! import never starves other work. A [`StopFlag`] is honored between files,
//! never inside one.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::classify::date_text;
use crate::config::{ColumnNames, StaffColumns};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::HistoryRecord;
use crate::rows::{CsvSpreadsheetReader, RawRow, SpreadsheetReader};
use crate::staff::staff_from_rows;

/// Cooperative cancellation shared between the queue and its caller
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the queue to stop before its next file
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// SHA-256 of file contents, hex encoded
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// CSV reader that keeps the sales export's identifier columns as text
pub fn sales_reader(columns: &ColumnNames) -> CsvSpreadsheetReader {
    CsvSpreadsheetReader::new().with_text_columns(columns.text_columns())
}

/// Convert sales rows into history records
///
/// Rows without a customer or item id carry nothing to match against and
/// are skipped. `store_name` overrides the store column when given.
pub fn history_records_from_rows(
    rows: &[RawRow],
    columns: &ColumnNames,
    store_name: Option<&str>,
) -> Vec<HistoryRecord> {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = 0;

    for row in rows {
        let (Some(customer_id), Some(item_id)) =
            (row.text(&columns.customer_id), row.text(&columns.item_id))
        else {
            skipped += 1;
            continue;
        };

        records.push(HistoryRecord {
            customer_id,
            item_id,
            date: date_text(row.get(&columns.date)),
            quantity: row.number(&columns.quantity).unwrap_or(0.0).round() as i64,
            store_name: store_name
                .map(str::to_string)
                .or_else(|| row.text(&columns.store_name)),
            sales_person: row.text(&columns.sales_person),
            price: row.number(&columns.unit_price),
            unit: row.text(&columns.unit),
            item_name: row.text(&columns.item_name),
            amount: row.number(&columns.amount),
            category: row.text(&columns.category),
            points: row.number(&columns.points),
            ticket_no: row.text(&columns.ticket_no),
        });
    }

    if skipped > 0 {
        debug!("Skipped {} rows without customer or item id", skipped);
    }
    records
}

/// A file waiting in the import queue
#[derive(Debug, Clone)]
pub struct ImportFile {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Store to file the rows under; falls back to the store column
    pub store_name: Option<String>,
}

/// Progress reported after every committed chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportProgress {
    /// Zero-based position of the file in the queue
    pub file_index: usize,
    pub file_count: usize,
    pub file_name: String,
    pub rows_done: usize,
    pub rows_total: usize,
}

/// Result for one imported file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub name: String,
    pub session_id: i64,
    pub rows_inserted: usize,
    /// Earlier completed import of identical content, if any
    pub duplicate_of: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub files: Vec<FileOutcome>,
    /// Whether the stop flag ended the queue early
    pub stopped: bool,
    /// Files abandoned because of the stop flag
    pub abandoned: usize,
}

impl ImportSummary {
    pub fn rows_inserted(&self) -> usize {
        self.files.iter().map(|f| f.rows_inserted).sum()
    }
}

type ProgressFn<'a> = Box<dyn FnMut(&ImportProgress) + 'a>;

/// Sequential, chunked history import
pub struct ImportQueue<'a> {
    db: &'a Database,
    reader: &'a dyn SpreadsheetReader,
    columns: &'a ColumnNames,
    chunk_size: usize,
    stop: StopFlag,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> ImportQueue<'a> {
    pub fn new(
        db: &'a Database,
        reader: &'a dyn SpreadsheetReader,
        columns: &'a ColumnNames,
        chunk_size: usize,
    ) -> Self {
        Self {
            db,
            reader,
            columns,
            chunk_size: chunk_size.max(1),
            stop: StopFlag::new(),
            progress: None,
        }
    }

    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn on_progress(mut self, callback: impl FnMut(&ImportProgress) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Import every file in order
    ///
    /// A failing file is marked failed and aborts the queue with its error;
    /// chunks committed before the failure stay in the store.
    pub async fn run(&mut self, files: Vec<ImportFile>) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        let file_count = files.len();

        for (index, file) in files.into_iter().enumerate() {
            if self.stop.is_stopped() {
                summary.stopped = true;
                summary.abandoned = file_count - index;
                info!("Import stopped; {} files not started", summary.abandoned);
                break;
            }
            let outcome = self.import_file(index, file_count, file).await?;
            summary.files.push(outcome);
        }

        info!(
            "Imported {} rows from {} files",
            summary.rows_inserted(),
            summary.files.len()
        );
        Ok(summary)
    }

    async fn import_file(
        &mut self,
        index: usize,
        file_count: usize,
        file: ImportFile,
    ) -> Result<FileOutcome> {
        let hash = content_hash(&file.bytes);
        let duplicate_of = self
            .db
            .find_import_session_by_hash(&hash)?
            .map(|session| session.id);
        if let Some(id) = duplicate_of {
            warn!(
                "{} has the same content as import #{}; importing again",
                file.name, id
            );
        }

        let session_id = self.db.create_import_session(
            Some(&file.name),
            &hash,
            file.store_name.as_deref(),
        )?;

        let mut inserted = 0;
        match self
            .insert_file(index, file_count, &file, &mut inserted)
            .await
        {
            Ok(()) => {
                self.db
                    .complete_import_session(session_id, inserted as i64)?;
            }
            Err(e) => {
                if let Err(log_err) =
                    self.db
                        .fail_import_session(session_id, inserted as i64, &e.to_string())
                {
                    warn!("Could not mark import #{} failed: {}", session_id, log_err);
                }
                return Err(e);
            }
        }

        Ok(FileOutcome {
            name: file.name,
            session_id,
            rows_inserted: inserted,
            duplicate_of,
        })
    }

    async fn insert_file(
        &mut self,
        index: usize,
        file_count: usize,
        file: &ImportFile,
        inserted: &mut usize,
    ) -> Result<()> {
        let rows = self
            .reader
            .read_rows(&mut file.bytes.as_slice())
            .map_err(|e| Error::Import(format!("{}: {}", file.name, e)))?;
        let records =
            history_records_from_rows(&rows, self.columns, file.store_name.as_deref());
        debug!("{}: {} history records", file.name, records.len());

        for chunk in records.chunks(self.chunk_size) {
            *inserted += self.db.insert_history_chunk(chunk)?;
            if let Some(progress) = self.progress.as_mut() {
                progress(&ImportProgress {
                    file_index: index,
                    file_count,
                    file_name: file.name.clone(),
                    rows_done: *inserted,
                    rows_total: records.len(),
                });
            }
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

/// Read a staff list and upsert every entry
pub fn import_staff(
    db: &Database,
    reader: &dyn SpreadsheetReader,
    input: &mut dyn Read,
    columns: &StaffColumns,
) -> Result<usize> {
    let rows = reader.read_rows(input)?;
    let staff = staff_from_rows(&rows, columns);
    let count = db.upsert_staff_batch(&staff)?;
    info!("Imported {} staff entries", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UNCLASSIFIED_STORE;

    fn sales_csv(rows: usize) -> Vec<u8> {
        let mut csv = String::from("會員編號,商品編號,銷售日期,數量,單價,點數,門市\n");
        for i in 0..rows {
            csv.push_str(&format!("C{:04},00{},1130301,1,100,5,\n", i % 50, i % 7));
        }
        csv.into_bytes()
    }

    fn file(name: &str, rows: usize, store: Option<&str>) -> ImportFile {
        ImportFile {
            name: name.to_string(),
            bytes: sales_csv(rows),
            store_name: store.map(str::to_string),
        }
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
        assert_eq!(content_hash(b"").len(), 64);
    }

    #[test]
    fn test_history_records_from_rows() {
        let columns = ColumnNames::default();
        let rows = vec![
            RawRow::new()
                .with_text("會員編號", "C1")
                .with_text("商品編號", "00123")
                .with_text("銷售日期", "2024-03-05")
                .with_number("數量", 2.0)
                .with_text("門市", "中山店"),
            RawRow::new().with_text("商品編號", "1"),
        ];

        let records = history_records_from_rows(&rows, &columns, None);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].item_id, "00123");
        assert_eq!(records[0].date, "1130305");
        assert_eq!(records[0].quantity, 2);
        assert_eq!(records[0].store_name.as_deref(), Some("中山店"));

        let records = history_records_from_rows(&rows, &columns, Some("信義店"));
        assert_eq!(records[0].store_name.as_deref(), Some("信義店"));
    }

    #[tokio::test]
    async fn test_queue_imports_in_chunks() {
        let db = Database::in_memory().unwrap();
        let columns = ColumnNames::default();
        let reader = sales_reader(&columns);
        let mut chunks = Vec::new();

        let summary = {
            let mut queue =
                ImportQueue::new(&db, &reader, &columns, 40).on_progress(|p| chunks.push(p.rows_done));
            queue
                .run(vec![file("a.csv", 100, Some("中山店")), file("b.csv", 10, None)])
                .await
                .unwrap()
        };

        assert_eq!(summary.rows_inserted(), 110);
        assert!(!summary.stopped);
        assert_eq!(chunks, vec![40, 80, 100, 10]);
        assert_eq!(db.count_history().unwrap(), 110);

        let stats = db.history_stats_by_store().unwrap();
        assert_eq!(stats[0].store_name, "中山店");
        assert_eq!(stats[0].count, 100);
        assert_eq!(stats[1].store_name, UNCLASSIFIED_STORE);

        let sessions = db.list_import_sessions().unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_file_reported_and_imported() {
        let db = Database::in_memory().unwrap();
        let columns = ColumnNames::default();
        let reader = sales_reader(&columns);

        let mut queue = ImportQueue::new(&db, &reader, &columns, 2000);
        let first = queue.run(vec![file("a.csv", 5, None)]).await.unwrap();
        let second = queue.run(vec![file("a-copy.csv", 5, None)]).await.unwrap();

        assert_eq!(first.files[0].duplicate_of, None);
        assert_eq!(second.files[0].duplicate_of, Some(first.files[0].session_id));
        assert_eq!(db.count_history().unwrap(), 10);
    }

    #[tokio::test]
    async fn test_stop_flag_checked_between_files() {
        let db = Database::in_memory().unwrap();
        let columns = ColumnNames::default();
        let reader = sales_reader(&columns);
        let stop = StopFlag::new();
        let stopper = stop.clone();

        let summary = {
            let mut queue = ImportQueue::new(&db, &reader, &columns, 10)
                .with_stop_flag(stop)
                .on_progress(move |p| {
                    // request a stop while the first file is still running
                    if p.file_index == 0 {
                        stopper.stop();
                    }
                });
            queue
                .run(vec![
                    file("a.csv", 30, None),
                    file("b.csv", 30, None),
                    file("c.csv", 30, None),
                ])
                .await
                .unwrap()
        };

        // the running file finishes; the rest are abandoned
        assert!(summary.stopped);
        assert_eq!(summary.files.len(), 1);
        assert_eq!(summary.abandoned, 2);
        assert_eq!(db.count_history().unwrap(), 30);
    }

    #[tokio::test]
    async fn test_unreadable_file_marks_session_failed() {
        let db = Database::in_memory().unwrap();
        let columns = ColumnNames::default();
        let reader = sales_reader(&columns);

        let bad = ImportFile {
            name: "bad.csv".to_string(),
            bytes: b"\xff\xfe\x00not,utf8\n\xff,\xfe\n".to_vec(),
            store_name: None,
        };
        let mut queue = ImportQueue::new(&db, &reader, &columns, 10);
        let result = queue.run(vec![bad]).await;
        assert!(matches!(result, Err(Error::Import(_))));

        let sessions = db.list_import_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].error.is_some());
    }

    #[test]
    fn test_import_staff() {
        let db = Database::in_memory().unwrap();
        let columns = StaffColumns::default();
        let csv = "員工編號,姓名,職位\n001,王小明,門市\n002,林藥師,藥師\n";
        let reader = CsvSpreadsheetReader::new().with_text_columns(columns.text_columns());

        let count = import_staff(&db, &reader, &mut csv.as_bytes(), &columns).unwrap();
        assert_eq!(count, 2);
        assert_eq!(db.list_staff().unwrap()[0].id, "001");
    }
}
