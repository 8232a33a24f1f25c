//! Raw spreadsheet rows
//!
//! A reader turns an uploaded file into an ordered list of rows, each a map
//! from header text to cell value. The first row is always the header row.

use std::collections::HashMap;
use std::io::Read;

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// A single cell value read from a spreadsheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Text form of the value (numbers without a trailing `.0`)
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
        }
    }

    /// Numeric form of the value, accepting thousands separators in text
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
                if cleaned.is_empty() {
                    None
                } else {
                    cleaned.parse().ok()
                }
            }
        }
    }
}

/// One data row keyed by header text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow(pub HashMap<String, RawValue>);

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and staff imports
    pub fn with(mut self, header: &str, value: RawValue) -> Self {
        self.0.insert(header.to_string(), value);
        self
    }

    pub fn with_text(self, header: &str, value: &str) -> Self {
        self.with(header, RawValue::Text(value.to_string()))
    }

    pub fn with_number(self, header: &str, value: f64) -> Self {
        self.with(header, RawValue::Number(value))
    }

    pub fn get(&self, header: &str) -> Option<&RawValue> {
        self.0.get(header)
    }

    /// Non-empty trimmed text for a header
    pub fn text(&self, header: &str) -> Option<String> {
        self.get(header)
            .map(RawValue::as_text)
            .filter(|s| !s.is_empty())
    }

    pub fn number(&self, header: &str) -> Option<f64> {
        self.get(header).and_then(RawValue::as_number)
    }
}

/// Reads an uploaded spreadsheet into rows
pub trait SpreadsheetReader {
    fn read_rows(&self, reader: &mut dyn Read) -> Result<Vec<RawRow>>;
}

/// CSV implementation of [`SpreadsheetReader`]
///
/// Numeric-looking cells become [`RawValue::Number`] except for columns
/// listed in `text_columns` (identifiers such as item codes keep their
/// leading zeros).
#[derive(Debug, Clone, Default)]
pub struct CsvSpreadsheetReader {
    text_columns: Vec<String>,
}

impl CsvSpreadsheetReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep these columns as text even when they look numeric
    pub fn with_text_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

impl SpreadsheetReader for CsvSpreadsheetReader {
    fn read_rows(&self, reader: &mut dyn Read) -> Result<Vec<RawRow>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();
        let mut rows = Vec::new();

        for result in rdr.records() {
            let record = result?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            let mut row = RawRow::new();
            for (i, header) in headers.iter().enumerate() {
                let Some(field) = record.get(i) else {
                    continue;
                };
                let field = field.trim();
                if field.is_empty() {
                    continue;
                }
                let value = if self.text_columns.iter().any(|c| c == header) {
                    RawValue::Text(field.to_string())
                } else {
                    match field.parse::<f64>() {
                        Ok(n) if n.is_finite() => RawValue::Number(n),
                        _ => RawValue::Text(field.to_string()),
                    }
                };
                row.0.insert(header.clone(), value);
            }
            rows.push(row);
        }

        debug!("Read {} spreadsheet rows", rows.len());
        Ok(rows)
    }
}
