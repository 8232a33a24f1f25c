//! Per-role cell coordinate mapping for template exports
//!
//! Each role (store clerk, pharmacist) binds logical fields to spreadsheet
//! coordinates: list fields to a column letter (`"C"`, `"AB"`), fixed
//! statistics to an absolute address (`"B3"`). Unbound fields are not
//! written. A user mapping is merged field-by-field with the built-in
//! defaults through [`RoleMapping::merged_with`].

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::StaffRole;

fn column_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{1,2}$").expect("valid column regex"))
}

fn cell_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z]{1,2})([1-9][0-9]*)$").expect("valid cell regex"))
}

/// Zero-based column index from 1-2 letters
fn letters_to_index(letters: &str) -> u16 {
    letters
        .bytes()
        .fold(0u16, |acc, b| acc * 26 + u16::from(b - b'A' + 1))
        - 1
}

fn index_to_letters(index: u16) -> String {
    let mut n = u32::from(index) + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// A spreadsheet column bound to a list field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnRef(u16);

impl ColumnRef {
    /// Zero-based column index
    pub fn index(&self) -> u16 {
        self.0
    }

    pub fn letters(&self) -> String {
        index_to_letters(self.0)
    }
}

impl std::str::FromStr for ColumnRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_uppercase();
        if !column_regex().is_match(&s) {
            return Err(Error::Config(format!(
                "Invalid column letter '{}' (expected 1-2 letters)",
                s
            )));
        }
        Ok(Self(letters_to_index(&s)))
    }
}

impl TryFrom<String> for ColumnRef {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ColumnRef> for String {
    fn from(c: ColumnRef) -> Self {
        c.letters()
    }
}

/// An absolute cell address bound to a fixed statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRef {
    /// Zero-based row
    pub row: u32,
    /// Zero-based column
    pub col: u16,
}

impl std::str::FromStr for CellRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_uppercase();
        let caps = cell_regex().captures(&s).ok_or_else(|| {
            Error::Config(format!(
                "Invalid cell address '{}' (expected letters followed by a row number)",
                s
            ))
        })?;
        let row: u32 = caps[2]
            .parse()
            .map_err(|_| Error::Config(format!("Row number out of range in '{}'", s)))?;
        Ok(Self {
            row: row - 1,
            col: letters_to_index(&caps[1]),
        })
    }
}

impl TryFrom<String> for CellRef {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<CellRef> for String {
    fn from(c: CellRef) -> Self {
        format!("{}{}", index_to_letters(c.col), c.row + 1)
    }
}

/// Merge `Option` fields: keep the left value, fall back to the right
macro_rules! merge_fields {
    ($target:ident, $primary:expr, $fallback:expr; $($field:ident),+ $(,)?) => {
        $target {
            $($field: $primary.$field.or($fallback.$field),)+
        }
    };
}

/// Column bindings for the classified sales list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListColumns {
    pub category: Option<ColumnRef>,
    pub date: Option<ColumnRef>,
    pub customer_id: Option<ColumnRef>,
    pub customer_name: Option<ColumnRef>,
    pub item_id: Option<ColumnRef>,
    pub item_name: Option<ColumnRef>,
    pub quantity: Option<ColumnRef>,
    pub amount: Option<ColumnRef>,
    pub points: Option<ColumnRef>,
    pub status: Option<ColumnRef>,
    pub original_developer: Option<ColumnRef>,
    pub repurchase_type: Option<ColumnRef>,
    pub seller: Option<ColumnRef>,
}

impl ListColumns {
    fn merged_with(&self, defaults: &Self) -> Self {
        merge_fields!(ListColumns, self, defaults;
            category, date, customer_id, customer_name, item_id, item_name,
            quantity, amount, points, status, original_developer,
            repurchase_type, seller,
        )
    }

    /// All bound columns, in declaration order
    pub fn bound(&self) -> Vec<ColumnRef> {
        [
            self.category,
            self.date,
            self.customer_id,
            self.customer_name,
            self.item_id,
            self.item_name,
            self.quantity,
            self.amount,
            self.points,
            self.status,
            self.original_developer,
            self.repurchase_type,
            self.seller,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Column bindings for the store clerk rewards list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardColumns {
    /// One-based first data row of the rewards list
    pub start_row: Option<u32>,
    pub date: Option<ColumnRef>,
    pub customer_id: Option<ColumnRef>,
    pub item_id: Option<ColumnRef>,
    pub item_name: Option<ColumnRef>,
    pub quantity: Option<ColumnRef>,
    pub reward: Option<ColumnRef>,
    pub kind: Option<ColumnRef>,
}

impl RewardColumns {
    fn merged_with(&self, defaults: &Self) -> Self {
        merge_fields!(RewardColumns, self, defaults;
            start_row, date, customer_id, item_id, item_name, quantity, reward, kind,
        )
    }

    pub fn bound(&self) -> Vec<ColumnRef> {
        [
            self.date,
            self.customer_id,
            self.item_id,
            self.item_name,
            self.quantity,
            self.reward,
            self.kind,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Fixed single-cell statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatCells {
    pub store_name: Option<CellRef>,
    pub staff_id: Option<CellRef>,
    pub staff_name: Option<CellRef>,
    pub branch: Option<CellRef>,
    pub role: Option<CellRef>,
    pub period: Option<CellRef>,
    pub total_points: Option<CellRef>,
    pub points_standard: Option<CellRef>,
    pub points_gap: Option<CellRef>,
    pub develop_points: Option<CellRef>,
    pub half_year_points: Option<CellRef>,
    pub return_points: Option<CellRef>,
    pub incoming_return_points: Option<CellRef>,
    pub develop_count: Option<CellRef>,
    pub return_count: Option<CellRef>,
    pub repurchase_count: Option<CellRef>,
    pub cosmetic_total: Option<CellRef>,
    pub cosmetic_standard: Option<CellRef>,
    pub cosmetic_gap: Option<CellRef>,
    pub cash_reward: Option<CellRef>,
    pub voucher_reward: Option<CellRef>,
    pub reward_total: Option<CellRef>,
}

impl StatCells {
    fn merged_with(&self, defaults: &Self) -> Self {
        merge_fields!(StatCells, self, defaults;
            store_name, staff_id, staff_name, branch, role, period,
            total_points, points_standard, points_gap, develop_points,
            half_year_points, return_points, incoming_return_points,
            develop_count, return_count, repurchase_count, cosmetic_total,
            cosmetic_standard, cosmetic_gap, cash_reward, voucher_reward,
            reward_total,
        )
    }

    fn any_bound(&self) -> bool {
        self.store_name.is_some()
            || self.staff_id.is_some()
            || self.staff_name.is_some()
            || self.total_points.is_some()
            || self.cosmetic_total.is_some()
            || self.reward_total.is_some()
    }
}

/// Complete coordinate mapping for one role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleMapping {
    /// One-based first data row of the classified sales list
    pub start_row: Option<u32>,
    pub columns: ListColumns,
    pub rewards: RewardColumns,
    pub cells: StatCells,
}

impl RoleMapping {
    /// Field-wise merge: values set here win, unset fields fall back to `defaults`
    pub fn merged_with(&self, defaults: &Self) -> Self {
        Self {
            start_row: self.start_row.or(defaults.start_row),
            columns: self.columns.merged_with(&defaults.columns),
            rewards: self.rewards.merged_with(&defaults.rewards),
            cells: self.cells.merged_with(&defaults.cells),
        }
    }

    /// Whether the mapping can drive a template export at all
    pub fn is_usable(&self) -> bool {
        let has_list = self.start_row.is_some() && !self.columns.bound().is_empty();
        has_list || self.cells.any_bound()
    }
}

/// Mappings for both bonus-earning roles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportMappings {
    pub sales: RoleMapping,
    pub pharmacist: RoleMapping,
}

impl ExportMappings {
    pub fn for_role(&self, role: StaffRole) -> Option<&RoleMapping> {
        match role {
            StaffRole::Sales => Some(&self.sales),
            StaffRole::Pharmacist => Some(&self.pharmacist),
            StaffRole::NoBonus => None,
        }
    }

    pub fn merged_with(&self, defaults: &Self) -> Self {
        Self {
            sales: self.sales.merged_with(&defaults.sales),
            pharmacist: self.pharmacist.merged_with(&defaults.pharmacist),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ref_parse() {
        assert_eq!("A".parse::<ColumnRef>().unwrap().index(), 0);
        assert_eq!("z".parse::<ColumnRef>().unwrap().index(), 25);
        assert_eq!("AA".parse::<ColumnRef>().unwrap().index(), 26);
        assert_eq!("AB".parse::<ColumnRef>().unwrap().letters(), "AB");
        assert!("ABC".parse::<ColumnRef>().is_err());
        assert!("A1".parse::<ColumnRef>().is_err());
        assert!("".parse::<ColumnRef>().is_err());
    }

    #[test]
    fn test_cell_ref_parse() {
        let c: CellRef = "B3".parse().unwrap();
        assert_eq!((c.row, c.col), (2, 1));
        let c: CellRef = "aa10".parse().unwrap();
        assert_eq!((c.row, c.col), (9, 26));
        assert!("B0".parse::<CellRef>().is_err());
        assert!("3B".parse::<CellRef>().is_err());
        assert_eq!(String::from(c), "AA10");
    }

    #[test]
    fn test_merged_with_prefers_user_values() {
        let defaults = RoleMapping {
            start_row: Some(8),
            columns: ListColumns {
                date: Some("A".parse().unwrap()),
                points: Some("F".parse().unwrap()),
                ..Default::default()
            },
            ..Default::default()
        };
        let user = RoleMapping {
            columns: ListColumns {
                points: Some("H".parse().unwrap()),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = user.merged_with(&defaults);
        assert_eq!(merged.start_row, Some(8));
        assert_eq!(merged.columns.date.unwrap().letters(), "A");
        assert_eq!(merged.columns.points.unwrap().letters(), "H");
    }

    #[test]
    fn test_is_usable() {
        assert!(!RoleMapping::default().is_usable());

        let only_row = RoleMapping {
            start_row: Some(5),
            ..Default::default()
        };
        assert!(!only_row.is_usable());

        let with_cell = RoleMapping {
            cells: StatCells {
                total_points: Some("C2".parse().unwrap()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(with_cell.is_usable());
    }

    #[test]
    fn test_mapping_from_toml() {
        let toml_str = r#"
            start_row = 6
            [columns]
            date = "A"
            points = "g"
            [cells]
            staff_name = "B2"
        "#;
        let mapping: RoleMapping = toml::from_str(toml_str).unwrap();
        assert_eq!(mapping.start_row, Some(6));
        assert_eq!(mapping.columns.points.unwrap().index(), 6);
        assert_eq!(mapping.cells.staff_name.unwrap(), CellRef { row: 1, col: 1 });
    }

    #[test]
    fn test_mapping_rejects_bad_coordinate() {
        let toml_str = r#"
            [columns]
            date = "A1"
        "#;
        assert!(toml::from_str::<RoleMapping>(toml_str).is_err());
    }
}
