//! Staff directory snapshot and staff list imports

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::StaffColumns;
use crate::db::Database;
use crate::error::Result;
use crate::models::{Staff, StaffRole};
use crate::rows::RawRow;

/// Name-indexed view of the staff directory used during classification
#[derive(Debug, Clone, Default)]
pub struct StaffDirectory {
    by_name: HashMap<String, Staff>,
}

impl StaffDirectory {
    pub fn new(staff: Vec<Staff>) -> Self {
        Self {
            by_name: staff
                .into_iter()
                .map(|s| (s.name.trim().to_string(), s))
                .collect(),
        }
    }

    pub fn load(db: &Database) -> Result<Self> {
        Ok(Self::new(db.list_staff()?))
    }

    pub fn get(&self, name: &str) -> Option<&Staff> {
        self.by_name.get(name.trim())
    }

    /// Role of a sales person; people missing from the directory are store clerks
    pub fn role_of(&self, name: &str) -> StaffRole {
        match self.get(name) {
            Some(staff) => staff.role,
            None => {
                debug!("{} is not in the staff directory, treating as SALES", name);
                StaffRole::Sales
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Parse staff list rows; rows without an id or name are skipped
pub fn staff_from_rows(rows: &[RawRow], columns: &StaffColumns) -> Vec<Staff> {
    let mut staff = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let (Some(id), Some(name)) = (row.text(&columns.id), row.text(&columns.name)) else {
            debug!("Skipping staff row {}: missing id or name", i + 2);
            continue;
        };

        let role = match row.text(&columns.role) {
            Some(text) => text.parse().unwrap_or_else(|e| {
                warn!("Staff {}: {}, defaulting to SALES", name, e);
                StaffRole::Sales
            }),
            None => StaffRole::Sales,
        };

        staff.push(Staff {
            id,
            name,
            role,
            branch: row.text(&columns.branch),
            customer_id: row.text(&columns.customer_id),
            points_standard: row.number(&columns.points_standard),
            cosmetic_standard: row.number(&columns.cosmetic_standard),
        });
    }

    staff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_from_rows() {
        let cols = StaffColumns::default();
        let rows = vec![
            RawRow::new()
                .with_text("員工編號", "007")
                .with_text("姓名", "王小明")
                .with_text("職位", "藥師")
                .with_number("點數標準", 300.0),
            RawRow::new().with_text("姓名", "沒有編號"),
            RawRow::new()
                .with_text("員工編號", "8")
                .with_text("姓名", "李大華")
                .with_text("職位", "店長"),
        ];

        let staff = staff_from_rows(&rows, &cols);
        assert_eq!(staff.len(), 2);
        assert_eq!(staff[0].id, "007");
        assert_eq!(staff[0].role, StaffRole::Pharmacist);
        assert_eq!(staff[0].points_standard, Some(300.0));
        // Unknown role text falls back to store clerk
        assert_eq!(staff[1].role, StaffRole::Sales);
    }

    #[test]
    fn test_directory_role_lookup() {
        let dir = StaffDirectory::new(vec![Staff {
            id: "1".to_string(),
            name: "陳藥師".to_string(),
            role: StaffRole::Pharmacist,
            branch: None,
            customer_id: None,
            points_standard: None,
            cosmetic_standard: None,
        }]);

        assert_eq!(dir.role_of(" 陳藥師 "), StaffRole::Pharmacist);
        assert_eq!(dir.role_of("路人"), StaffRole::Sales);
    }
}
