//! Domain models for pointbook

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel store name reported for history records imported without a store
pub const UNCLASSIFIED_STORE: &str = "(未分類)";

/// Staff roles. The role decides which division rules apply to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    /// Store clerk
    #[default]
    Sales,
    Pharmacist,
    /// Listed in the directory but never credited
    NoBonus,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "SALES",
            Self::Pharmacist => "PHARMACIST",
            Self::NoBonus => "NO_BONUS",
        }
    }

    /// Human label used on exported sheets
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sales => "門市",
            Self::Pharmacist => "藥師",
            Self::NoBonus => "不計獎金",
        }
    }
}

impl std::str::FromStr for StaffRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SALES" | "CLERK" | "門市" | "門市人員" => Ok(Self::Sales),
            "PHARMACIST" | "藥師" => Ok(Self::Pharmacist),
            "NO_BONUS" | "NONE" | "不計獎金" => Ok(Self::NoBonus),
            _ => Err(format!("Unknown staff role: {}", s)),
        }
    }
}

impl std::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An employee in the staff directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    /// Employee number, sorted numerically ignoring leading zeros
    pub id: String,
    /// Joins against the sales person column of POS exports
    pub name: String,
    pub role: StaffRole,
    pub branch: Option<String>,
    /// Customer id the employee uses for self purchases
    pub customer_id: Option<String>,
    pub points_standard: Option<f64>,
    pub cosmetic_standard: Option<f64>,
}

/// Compare staff ids numerically when both are digits, ignoring leading zeros
pub fn compare_staff_ids(a: &str, b: &str) -> Ordering {
    let a = a.trim();
    let b = b.trim();
    let a_numeric = !a.is_empty() && a.chars().all(|c| c.is_ascii_digit());
    let b_numeric = !b.is_empty() && b.chars().all(|c| c.is_ascii_digit());

    match (a_numeric, b_numeric) {
        (true, true) => {
            let a_digits = a.trim_start_matches('0');
            let b_digits = b.trim_start_matches('0');
            a_digits
                .len()
                .cmp(&b_digits.len())
                .then_with(|| a_digits.cmp(b_digits))
                .then_with(|| a.len().cmp(&b.len()))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

/// One durable record per accepted historical sales line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HistoryRecord {
    pub customer_id: String,
    pub item_id: String,
    /// `YYYY-MM-DD` or ROC compact `YYYMMDD`
    pub date: String,
    /// Negative quantities are returns
    pub quantity: i64,
    /// None for legacy records imported before stores were tracked
    pub store_name: Option<String>,
    pub sales_person: Option<String>,
    pub price: Option<f64>,
    pub unit: Option<String>,
    pub item_name: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub points: Option<f64>,
    pub ticket_no: Option<String>,
}

/// Record count for one store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub store_name: String,
    pub count: i64,
}

/// Record count for one month of one ROC year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthStats {
    /// Two-digit month, e.g. "03"
    pub month: String,
    pub count: i64,
}

/// An item inside a product group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupItem {
    pub item_id: String,
    /// Short display label shown next to the item
    pub alias: String,
}

/// A stored product group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductGroup {
    pub id: i64,
    pub group_name: String,
    pub items: Vec<GroupItem>,
}

/// A product group to be created or replaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProductGroup {
    pub group_name: String,
    pub items: Vec<GroupItem>,
}

/// Import session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Processing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown import status: {}", s)),
        }
    }
}

/// One imported history file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSession {
    pub id: i64,
    pub filename: Option<String>,
    /// SHA-256 of the file contents (hex)
    pub content_hash: String,
    pub store_name: Option<String>,
    pub row_count: i64,
    pub status: ImportStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_role_parse() {
        assert_eq!("sales".parse::<StaffRole>().unwrap(), StaffRole::Sales);
        assert_eq!("藥師".parse::<StaffRole>().unwrap(), StaffRole::Pharmacist);
        assert_eq!("no_bonus".parse::<StaffRole>().unwrap(), StaffRole::NoBonus);
        assert!("manager".parse::<StaffRole>().is_err());
    }

    #[test]
    fn test_compare_staff_ids_numeric() {
        assert_eq!(compare_staff_ids("002", "10"), Ordering::Less);
        assert_eq!(compare_staff_ids("10", "9"), Ordering::Greater);
        assert_eq!(compare_staff_ids("07", "7"), Ordering::Greater);
        assert_eq!(compare_staff_ids("A1", "3"), Ordering::Greater);
        assert_eq!(compare_staff_ids("A1", "B1"), Ordering::Less);
    }

    #[test]
    fn test_staff_ids_sort() {
        let mut ids = vec!["12", "003", "A7", "1", "020"];
        ids.sort_by(|a, b| compare_staff_ids(a, b));
        assert_eq!(ids, vec!["1", "003", "12", "020", "A7"]);
    }
}
