//! Purchase history operations

use std::collections::BTreeSet;

use rusqlite::{params, params_from_iter, Connection, ToSql};
use tracing::{debug, info};

use super::Database;
use crate::dates::year_prefix;
use crate::error::Result;
use crate::grouping::normalize;
use crate::models::{HistoryRecord, MonthStats, StoreStats, UNCLASSIFIED_STORE};

const HISTORY_COLUMNS: &str = "customer_id, item_id, date, quantity, store_name, sales_person, \
     price, unit, item_name, amount, category, points, ticket_no";

/// WHERE fragment selecting one store; the sentinel name selects legacy rows
fn store_condition(store_name: &str) -> (&'static str, Vec<Box<dyn ToSql>>) {
    if store_name == UNCLASSIFIED_STORE {
        ("(store_name IS NULL OR store_name = '')", Vec::new())
    } else {
        (
            "store_name = ?",
            vec![Box::new(store_name.to_string()) as Box<dyn ToSql>],
        )
    }
}

/// Insert records on an open connection (or transaction)
pub(crate) fn insert_history_rows(conn: &Connection, records: &[HistoryRecord]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT INTO history_records (
            customer_id, item_id, item_id_normalized, date, quantity, store_name,
            sales_person, price, unit, item_name, amount, category, points, ticket_no
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )?;

    for record in records {
        stmt.execute(params![
            record.customer_id,
            record.item_id,
            normalize(&record.item_id),
            record.date,
            record.quantity,
            record.store_name,
            record.sales_person,
            record.price,
            record.unit,
            record.item_name,
            record.amount,
            record.category,
            record.points,
            record.ticket_no,
        ])?;
    }

    Ok(records.len())
}

impl Database {
    /// Append one chunk of history records in a single transaction
    pub fn insert_history_chunk(&self, records: &[HistoryRecord]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let inserted = insert_history_rows(&tx, records)?;
        tx.commit()?;

        debug!("Inserted history chunk of {} rows", inserted);
        Ok(inserted)
    }

    /// Append history records, committing every `chunk_size` rows
    ///
    /// No deduplication: importing the same rows twice stores them twice.
    pub fn bulk_insert_history(
        &self,
        records: &[HistoryRecord],
        chunk_size: usize,
    ) -> Result<usize> {
        let mut inserted = 0;
        for chunk in records.chunks(chunk_size.max(1)) {
            inserted += self.insert_history_chunk(chunk)?;
        }

        info!("Inserted {} history records", inserted);
        Ok(inserted)
    }

    /// Total number of history records
    pub fn count_history(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM history_records", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Record counts per store, largest first
    pub fn history_stats_by_store(&self) -> Result<Vec<StoreStats>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT COALESCE(NULLIF(store_name, ''), ?) AS store, COUNT(*) AS cnt
            FROM history_records
            GROUP BY store
            ORDER BY cnt DESC, store ASC
            "#,
        )?;

        let stats = stmt
            .query_map(params![UNCLASSIFIED_STORE], |row| {
                Ok(StoreStats {
                    store_name: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(stats)
    }

    /// Distinct ROC year prefixes present for a store, ascending
    pub fn history_years_for_store(&self, store_name: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let (condition, params) = store_condition(store_name);
        let sql = format!(
            "SELECT DISTINCT substr(date, 1, 3) FROM history_records WHERE {}",
            condition
        );

        let mut stmt = conn.prepare(&sql)?;
        let prefixes = stmt
            .query_map(params_from_iter(params.iter()), |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let years: BTreeSet<String> = prefixes
            .iter()
            .filter_map(|p| year_prefix(p).map(str::to_string))
            .collect();

        Ok(years.into_iter().collect())
    }

    /// Record counts per month for a store and ROC year
    pub fn history_monthly_stats(&self, store_name: &str, year: &str) -> Result<Vec<MonthStats>> {
        let conn = self.conn()?;
        let (condition, mut params) = store_condition(store_name);
        params.push(Box::new(year.to_string()));
        let sql = format!(
            r#"
            SELECT substr(date, 4, 2) AS month, COUNT(*)
            FROM history_records
            WHERE {} AND substr(date, 1, 3) = ?
            GROUP BY month
            ORDER BY month ASC
            "#,
            condition
        );

        let mut stmt = conn.prepare(&sql)?;
        let stats = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok(MonthStats {
                    month: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(stats)
    }

    /// Delete every record of a store
    pub fn delete_history_by_store(&self, store_name: &str) -> Result<usize> {
        self.delete_history_where(store_name, None)
    }

    /// Delete one ROC year of a store
    pub fn delete_history_by_store_year(&self, store_name: &str, year: &str) -> Result<usize> {
        self.delete_history_where(store_name, Some(year.to_string()))
    }

    /// Delete one month of one ROC year of a store
    pub fn delete_history_by_store_year_month(
        &self,
        store_name: &str,
        year: &str,
        month: &str,
    ) -> Result<usize> {
        self.delete_history_where(store_name, Some(format!("{}{:0>2}", year, month)))
    }

    fn delete_history_where(&self, store_name: &str, date_prefix: Option<String>) -> Result<usize> {
        let conn = self.conn()?;
        let (condition, mut params) = store_condition(store_name);
        let mut sql = format!("DELETE FROM history_records WHERE {}", condition);
        if let Some(prefix) = date_prefix {
            sql.push_str(" AND substr(date, 1, ?) = ?");
            params.push(Box::new(prefix.chars().count() as i64));
            params.push(Box::new(prefix));
        }

        let deleted = conn.execute(&sql, params_from_iter(params.iter()))?;
        info!("Deleted {} history records from {}", deleted, store_name);
        Ok(deleted)
    }

    /// Browse one store's records, optionally narrowed to a year or month
    pub fn page_history(
        &self,
        store_name: &str,
        year: Option<&str>,
        month: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<HistoryRecord>> {
        let conn = self.conn()?;
        let (condition, mut params) = store_condition(store_name);
        let mut sql = format!(
            "SELECT {} FROM history_records WHERE {}",
            HISTORY_COLUMNS, condition
        );
        if let Some(year) = year {
            sql.push_str(" AND substr(date, 1, 3) = ?");
            params.push(Box::new(year.to_string()));
            if let Some(month) = month {
                sql.push_str(" AND substr(date, 4, 2) = ?");
                params.push(Box::new(format!("{:0>2}", month)));
            }
        }
        sql.push_str(" ORDER BY date ASC, id ASC LIMIT ? OFFSET ?");
        params.push(Box::new(limit));
        params.push(Box::new(offset));

        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(params.iter()), Self::row_to_history)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Every history record in insertion order
    pub fn all_history(&self) -> Result<Vec<HistoryRecord>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM history_records ORDER BY id", HISTORY_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], Self::row_to_history)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Whether the customer has any stored purchase of one of the normalized item ids
    pub fn has_prior_purchase(&self, customer_id: &str, normalized_ids: &[String]) -> Result<bool> {
        if customer_id.is_empty() || normalized_ids.is_empty() {
            return Ok(false);
        }

        let conn = self.conn()?;
        let placeholders = vec!["?"; normalized_ids.len()].join(", ");
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM history_records \
             WHERE customer_id = ? AND item_id_normalized IN ({}))",
            placeholders
        );

        let mut stmt = conn.prepare_cached(&sql)?;
        let params = std::iter::once(customer_id).chain(normalized_ids.iter().map(String::as_str));
        let found: bool = stmt.query_row(params_from_iter(params), |row| row.get(0))?;
        Ok(found)
    }

    pub(crate) fn row_to_history(row: &rusqlite::Row) -> rusqlite::Result<HistoryRecord> {
        Ok(HistoryRecord {
            customer_id: row.get(0)?,
            item_id: row.get(1)?,
            date: row.get(2)?,
            quantity: row.get(3)?,
            store_name: row.get(4)?,
            sales_person: row.get(5)?,
            price: row.get(6)?,
            unit: row.get(7)?,
            item_name: row.get(8)?,
            amount: row.get(9)?,
            category: row.get(10)?,
            points: row.get(11)?,
            ticket_no: row.get(12)?,
        })
    }
}
