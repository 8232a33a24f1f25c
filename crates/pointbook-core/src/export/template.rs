//! Report templates
//!
//! A template is a styled sheet that reports are cloned from. Templates are
//! loaded once, when the user supplies them; a template that fails to parse
//! is reported then and the report for that role falls back to the plain
//! layout.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{info, warn};

use super::workbook::Sheet;
use crate::error::{Error, Result};
use crate::models::StaffRole;

/// Parses an uploaded template into a sheet model
pub trait TemplateLoader {
    fn load(&self, reader: &mut dyn Read) -> Result<Sheet>;
}

/// Loads templates stored as the JSON form of [`Sheet`]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTemplateLoader;

impl TemplateLoader for JsonTemplateLoader {
    fn load(&self, reader: &mut dyn Read) -> Result<Sheet> {
        let sheet: Sheet = serde_json::from_reader(reader)
            .map_err(|e| Error::Template(format!("Unreadable template: {}", e)))?;
        if sheet.cells.is_empty() {
            return Err(Error::Template("Template has no cells".to_string()));
        }
        Ok(sheet)
    }
}

/// Load a template file
pub fn load_template_file(loader: &dyn TemplateLoader, path: &Path) -> Result<Sheet> {
    let file = File::open(path)
        .map_err(|e| Error::Template(format!("Cannot open {}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);
    let sheet = loader.load(&mut reader)?;
    info!("Loaded template {} ({} cells)", path.display(), sheet.cells.len());
    Ok(sheet)
}

/// Templates per bonus-earning role
#[derive(Debug, Clone, Default)]
pub struct Templates {
    pub sales: Option<Sheet>,
    pub pharmacist: Option<Sheet>,
}

impl Templates {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn for_role(&self, role: StaffRole) -> Option<&Sheet> {
        match role {
            StaffRole::Sales => self.sales.as_ref(),
            StaffRole::Pharmacist => self.pharmacist.as_ref(),
            StaffRole::NoBonus => None,
        }
    }

    /// Load whichever templates are given
    ///
    /// A template that fails to load is returned in the error list and left
    /// out, so the report for that role uses the plain layout.
    pub fn load(
        loader: &dyn TemplateLoader,
        sales: Option<&Path>,
        pharmacist: Option<&Path>,
    ) -> (Self, Vec<Error>) {
        let mut errors = Vec::new();
        let mut load = |path: Option<&Path>| {
            path.and_then(|p| match load_template_file(loader, p) {
                Ok(sheet) => Some(sheet),
                Err(e) => {
                    warn!("Template {} unusable: {}", p.display(), e);
                    errors.push(e);
                    None
                }
            })
        };

        let templates = Self {
            sales: load(sales),
            pharmacist: load(pharmacist),
        };
        (templates, errors)
    }
}
