//! Staff directory operations

use rusqlite::{params, Connection, OptionalExtension};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{compare_staff_ids, Staff, StaffRole};

const STAFF_COLUMNS: &str =
    "id, name, role, branch, customer_id, points_standard, cosmetic_standard";

pub(crate) fn upsert_staff_row(conn: &Connection, staff: &Staff) -> Result<()> {
    let holder: Option<String> = conn
        .query_row(
            "SELECT id FROM staff WHERE name = ? AND id != ?",
            params![staff.name, staff.id],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(other) = holder {
        return Err(Error::Conflict(format!(
            "Staff name '{}' already belongs to employee {}",
            staff.name, other
        )));
    }

    conn.execute(
        r#"
        INSERT INTO staff (id, name, role, branch, customer_id, points_standard, cosmetic_standard)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            role = excluded.role,
            branch = excluded.branch,
            customer_id = excluded.customer_id,
            points_standard = excluded.points_standard,
            cosmetic_standard = excluded.cosmetic_standard
        "#,
        params![
            staff.id,
            staff.name,
            staff.role.as_str(),
            staff.branch,
            staff.customer_id,
            staff.points_standard,
            staff.cosmetic_standard,
        ],
    )?;
    Ok(())
}

impl Database {
    /// Create or update an employee by id
    ///
    /// Names must stay unique because sales rows join on them.
    pub fn upsert_staff(&self, staff: &Staff) -> Result<()> {
        if staff.id.trim().is_empty() || staff.name.trim().is_empty() {
            return Err(Error::InvalidData(
                "Staff id and name are required".to_string(),
            ));
        }
        let conn = self.conn()?;
        upsert_staff_row(&conn, staff)
    }

    /// Upsert many employees in one transaction
    pub fn upsert_staff_batch(&self, staff: &[Staff]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for member in staff {
            upsert_staff_row(&tx, member)?;
        }
        tx.commit()?;
        Ok(staff.len())
    }

    pub fn get_staff(&self, id: &str) -> Result<Option<Staff>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM staff WHERE id = ?", STAFF_COLUMNS);
        let staff = conn
            .query_row(&sql, params![id], Self::row_to_staff)
            .optional()?;
        Ok(staff)
    }

    /// Look up an employee by the name used in sales rows
    pub fn get_staff_by_name(&self, name: &str) -> Result<Option<Staff>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM staff WHERE name = ?", STAFF_COLUMNS);
        let staff = conn
            .query_row(&sql, params![name.trim()], Self::row_to_staff)
            .optional()?;
        Ok(staff)
    }

    /// All employees, ordered by employee number (numeric, leading zeros ignored)
    pub fn list_staff(&self) -> Result<Vec<Staff>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM staff", STAFF_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let mut staff = stmt
            .query_map([], Self::row_to_staff)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        staff.sort_by(|a, b| compare_staff_ids(&a.id, &b.id));
        Ok(staff)
    }

    /// Delete an employee; returns whether a row was removed
    pub fn delete_staff(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM staff WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    fn row_to_staff(row: &rusqlite::Row) -> rusqlite::Result<Staff> {
        let role: String = row.get(2)?;
        Ok(Staff {
            id: row.get(0)?,
            name: row.get(1)?,
            role: role.parse().unwrap_or(StaffRole::Sales),
            branch: row.get(3)?,
            customer_id: row.get(4)?,
            points_standard: row.get(5)?,
            cosmetic_standard: row.get(6)?,
        })
    }
}
