//! Report export
//!
//! Reports are built as an in-memory [`Workbook`], then rendered by a
//! [`SpreadsheetWriter`] and written to disk in one step.

pub mod mapping;
pub mod report;
pub mod template;
pub mod workbook;
pub mod xlsx;

pub use mapping::{CellRef, ColumnRef, ExportMappings, ListColumns, RewardColumns, RoleMapping, StatCells};
pub use report::{matrix_sheet, write_report, ReportBuilder, ReportOptions, MATRIX_SHEET};
pub use template::{load_template_file, JsonTemplateLoader, TemplateLoader, Templates};
pub use workbook::{Align, Cell, CellStyle, CellValue, MergeRange, Sheet, Workbook};
pub use xlsx::{SpreadsheetWriter, XlsxWriter};
