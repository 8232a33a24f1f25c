//! In-memory workbook model
//!
//! Reports are assembled here first and only rendered to bytes once the
//! whole workbook is complete, so a failure part way through never leaves a
//! partial file behind.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Excel's sheet name limit
const MAX_SHEET_NAME: usize = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Visual style of a cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellStyle {
    pub bold: bool,
    pub italic: bool,
    pub font_size: Option<f64>,
    /// 0xRRGGBB
    pub font_color: Option<u32>,
    /// 0xRRGGBB
    pub background: Option<u32>,
    pub align: Option<Align>,
    /// Thin border on every side
    pub border: bool,
    pub num_format: Option<String>,
}

impl CellStyle {
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Default::default()
        }
    }

    pub fn header() -> Self {
        Self {
            bold: true,
            background: Some(0xD9E1F2),
            border: true,
            align: Some(Align::Center),
            ..Default::default()
        }
    }

    pub fn bordered() -> Self {
        Self {
            border: true,
            ..Default::default()
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<usize> for CellValue {
    fn from(n: usize) -> Self {
        Self::Number(n as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub value: CellValue,
    #[serde(default)]
    pub style: CellStyle,
}

/// A merged region (zero-based, inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRange {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
}

impl MergeRange {
    pub fn contains(&self, row: u32, col: u16) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }
}

/// Cells are stored sparsely; in serialized form they are a flat list
mod cell_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{Cell, CellStyle, CellValue};

    #[derive(Serialize, Deserialize)]
    struct PositionedCell {
        row: u32,
        col: u16,
        #[serde(default)]
        value: CellValue,
        #[serde(default)]
        style: CellStyle,
    }

    pub fn serialize<S: Serializer>(
        cells: &BTreeMap<(u32, u16), Cell>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<PositionedCell> = cells
            .iter()
            .map(|(&(row, col), cell)| PositionedCell {
                row,
                col,
                value: cell.value.clone(),
                style: cell.style.clone(),
            })
            .collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<(u32, u16), Cell>, D::Error> {
        let list = Vec::<PositionedCell>::deserialize(deserializer)?;
        Ok(list
            .into_iter()
            .map(|c| {
                (
                    (c.row, c.col),
                    Cell {
                        value: c.value,
                        style: c.style,
                    },
                )
            })
            .collect())
    }
}

/// One worksheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    #[serde(default, with = "cell_list")]
    pub cells: BTreeMap<(u32, u16), Cell>,
    #[serde(default)]
    pub merges: Vec<MergeRange>,
    #[serde(default)]
    pub column_widths: BTreeMap<u16, f64>,
    #[serde(default)]
    pub row_heights: BTreeMap<u32, f64>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Copy of this sheet's content and visual layout under a new name
    pub fn clone_as(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn style_at(&self, row: u32, col: u16) -> CellStyle {
        self.get(row, col)
            .map(|c| c.style.clone())
            .unwrap_or_default()
    }

    /// Write a value and style
    pub fn set(&mut self, row: u32, col: u16, value: impl Into<CellValue>, style: CellStyle) {
        self.cells.insert(
            (row, col),
            Cell {
                value: value.into(),
                style,
            },
        );
    }

    /// Write a value keeping whatever style the cell already has
    pub fn put(&mut self, row: u32, col: u16, value: impl Into<CellValue>) {
        let cell = self.cells.entry((row, col)).or_default();
        cell.value = value.into();
    }

    pub fn merge(&mut self, range: MergeRange) {
        if !range.is_single_cell() {
            self.merges.push(range);
        }
    }

    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    /// Index of the last row holding a cell
    pub fn last_row(&self) -> Option<u32> {
        self.cells.keys().map(|(row, _)| *row).max()
    }
}

/// An ordered set of sheets with unique names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sheet name that is valid for Excel and unused in this workbook
    pub fn unique_sheet_name(&self, wanted: &str) -> String {
        let base: String = wanted
            .chars()
            .map(|c| match c {
                '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
                c => c,
            })
            .collect();
        let base = base.trim().trim_matches('\'');
        let base = if base.is_empty() { "Sheet" } else { base };

        // Sheet names are case-insensitive in XLSX
        let taken: HashSet<String> = self.sheets.iter().map(|s| s.name.to_lowercase()).collect();
        let truncate = |s: &str, max: usize| s.chars().take(max).collect::<String>();

        let candidate = truncate(base, MAX_SHEET_NAME);
        if !taken.contains(&candidate.to_lowercase()) {
            return candidate;
        }
        (2..)
            .map(|n| {
                let suffix = format!(" ({})", n);
                format!(
                    "{}{}",
                    truncate(base, MAX_SHEET_NAME - suffix.chars().count()),
                    suffix
                )
            })
            .find(|name| !taken.contains(&name.to_lowercase()))
            .unwrap_or_default()
    }

    pub fn push(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_keeps_style() {
        let mut sheet = Sheet::new("t");
        sheet.set(0, 0, "label", CellStyle::bold());
        sheet.put(0, 0, 42.0);
        let cell = sheet.get(0, 0).unwrap();
        assert_eq!(cell.value, CellValue::Number(42.0));
        assert!(cell.style.bold);
    }

    #[test]
    fn test_unique_sheet_names() {
        let mut wb = Workbook::new();
        wb.push(Sheet::new("王小明"));
        assert_eq!(wb.unique_sheet_name("王小明"), "王小明 (2)");
        assert_eq!(wb.unique_sheet_name("a/b"), "a_b");
        let long = "x".repeat(40);
        assert_eq!(wb.unique_sheet_name(&long).chars().count(), 31);
    }

    #[test]
    fn test_unique_sheet_names_ignore_case() {
        let mut wb = Workbook::new();
        wb.push(Sheet::new("Amy"));
        assert_eq!(wb.unique_sheet_name("amy"), "amy (2)");
        wb.push(Sheet::new("amy (2)"));
        assert_eq!(wb.unique_sheet_name("AMY"), "AMY (3)");
    }

    #[test]
    fn test_sheet_json_roundtrip_preserves_cells() {
        let mut sheet = Sheet::new("範本");
        sheet.set(2, 1, "姓名", CellStyle::header());
        sheet.merge(MergeRange {
            first_row: 0,
            first_col: 0,
            last_row: 0,
            last_col: 5,
        });
        sheet.set_column_width(1, 18.0);

        let json = serde_json::to_string(&sheet).unwrap();
        let parsed: Sheet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sheet);
    }

    #[test]
    fn test_single_cell_merge_ignored() {
        let mut sheet = Sheet::new("t");
        sheet.merge(MergeRange {
            first_row: 1,
            first_col: 1,
            last_row: 1,
            last_col: 1,
        });
        assert!(sheet.merges.is_empty());
    }
}
