//! Application configuration
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for an override file (explicit path, or
//!    ~/.local/share/pointbook/config.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Export cell mappings are merged field-by-field with the embedded defaults,
//! so an override only needs to list the coordinates it changes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::category::ADULT_DRINK;
use crate::error::{Error, Result};
use crate::export::mapping::ExportMappings;
use crate::rewards::{CosmeticBrand, RewardRule};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Default number of rows per insert chunk
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// Header names of the POS sales export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub sales_person: String,
    pub date: String,
    pub customer_id: String,
    pub customer_name: String,
    pub item_id: String,
    pub item_name: String,
    pub quantity: String,
    pub unit: String,
    pub unit_price: String,
    pub amount: String,
    pub points: String,
    pub category: String,
    pub ticket_no: String,
    pub debt: String,
    pub store_name: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            sales_person: "銷售人員".to_string(),
            date: "銷售日期".to_string(),
            customer_id: "會員編號".to_string(),
            customer_name: "會員姓名".to_string(),
            item_id: "商品編號".to_string(),
            item_name: "商品名稱".to_string(),
            quantity: "數量".to_string(),
            unit: "單位".to_string(),
            unit_price: "單價".to_string(),
            amount: "金額".to_string(),
            points: "點數".to_string(),
            category: "類別".to_string(),
            ticket_no: "單號".to_string(),
            debt: "欠款".to_string(),
            store_name: "門市".to_string(),
        }
    }
}

impl ColumnNames {
    /// Columns holding identifiers that must keep their leading zeros
    pub fn text_columns(&self) -> Vec<String> {
        vec![
            self.customer_id.clone(),
            self.item_id.clone(),
            self.ticket_no.clone(),
            self.date.clone(),
            self.category.clone(),
        ]
    }
}

/// Header names of a staff list spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffColumns {
    pub id: String,
    pub name: String,
    pub role: String,
    pub branch: String,
    pub customer_id: String,
    pub points_standard: String,
    pub cosmetic_standard: String,
}

impl Default for StaffColumns {
    fn default() -> Self {
        Self {
            id: "員工編號".to_string(),
            name: "姓名".to_string(),
            role: "職位".to_string(),
            branch: "分店".to_string(),
            customer_id: "會員編號".to_string(),
            points_standard: "點數標準".to_string(),
            cosmetic_standard: "美妝標準".to_string(),
        }
    }
}

impl StaffColumns {
    pub fn text_columns(&self) -> Vec<String> {
        vec![self.id.clone(), self.customer_id.clone()]
    }
}

/// Row acceptance lists and batching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Items credited only to pharmacists; dropped from the store clerk flow
    pub pharmacist_only_items: Vec<String>,
    /// Category whose single cans/bottles are never credited
    pub milk_category: String,
    pub excluded_milk_units: Vec<String>,
    /// Rows per insert chunk during history imports
    pub chunk_size: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            pharmacist_only_items: Vec::new(),
            milk_category: ADULT_DRINK.to_string(),
            excluded_milk_units: vec!["罐".to_string(), "瓶".to_string()],
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Printed on exported sheets
    pub store_name: String,
    pub columns: ColumnNames,
    pub staff_columns: StaffColumns,
    pub classification: ClassificationConfig,
    pub rewards: Vec<RewardRule>,
    pub cosmetic_brands: Vec<CosmeticBrand>,
    pub export: ExportMappings,
}

impl AppConfig {
    /// Load configuration (override first, then embedded default)
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let embedded = Self::embedded()?;

        let path = match override_path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let Some(path) = path else {
            return Ok(embedded);
        };
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
        debug!("Loading config override from {}", path.display());
        Self::from_toml_with_defaults(&content, &embedded)
    }

    /// The compiled-in default configuration
    pub fn embedded() -> Result<Self> {
        Ok(toml::from_str(DEFAULT_CONFIG)?)
    }

    /// Parse an override and merge its export mappings with `defaults`
    pub fn from_toml_with_defaults(content: &str, defaults: &Self) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.export = config.export.merged_with(&defaults.export);
        if config.store_name.is_empty() {
            config.store_name = defaults.store_name.clone();
        }
        if config.classification.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be at least 1".to_string()));
        }
        Ok(config)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("pointbook").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_parses() {
        let config = AppConfig::embedded().unwrap();
        assert_eq!(config.classification.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(config.export.sales.is_usable());
        assert!(config.export.pharmacist.is_usable());
        assert_eq!(config.columns.customer_id, "會員編號");
    }

    #[test]
    fn test_override_merges_export_mapping() {
        let defaults = AppConfig::embedded().unwrap();
        let override_toml = r#"
            store_name = "中山店"

            [export.sales.columns]
            points = "K"
        "#;
        let config = AppConfig::from_toml_with_defaults(override_toml, &defaults).unwrap();

        assert_eq!(config.store_name, "中山店");
        assert_eq!(config.export.sales.columns.points.unwrap().letters(), "K");
        // Untouched fields come from the defaults
        assert_eq!(config.export.sales.start_row, defaults.export.sales.start_row);
        assert_eq!(config.export.pharmacist, defaults.export.pharmacist);
    }

    #[test]
    fn test_override_rejects_zero_chunk() {
        let defaults = AppConfig::embedded().unwrap();
        let result = AppConfig::from_toml_with_defaults(
            "[classification]\nchunk_size = 0\n",
            &defaults,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/pointbook.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[classification]\npharmacist_only_items = [\"A100\"]\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.classification.pharmacist_only_items, vec!["A100"]);
        assert!(config.export.sales.is_usable());
    }
}
