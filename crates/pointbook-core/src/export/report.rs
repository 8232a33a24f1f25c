//! Bonus report assembly
//!
//! One sheet per selected person, plus a repurchase matrix sheet. A person
//! whose role has a template and a usable mapping gets a clone of the
//! template filled at the mapped coordinates; everyone else gets the plain
//! layout carrying the same figures.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::mapping::{ColumnRef, ExportMappings, RoleMapping};
use super::template::Templates;
use super::workbook::{Align, CellStyle, CellValue, MergeRange, Sheet, Workbook};
use super::xlsx::SpreadsheetWriter;
use crate::aggregate::{PersonSummary, RepurchaseMatrix};
use crate::error::{Error, Result};
use crate::models::StaffRole;
use crate::points::Stage1Row;
use crate::rewards::Stage2Row;
use crate::staff::StaffDirectory;

/// Name of the cross-person matrix sheet
pub const MATRIX_SHEET: &str = "回購矩陣";

const LIST_HEADERS: [&str; 12] = [
    "類別", "日期", "會員編號", "會員姓名", "商品編號", "商品名稱", "數量", "金額", "點數", "狀態",
    "原開發者", "回購類型",
];
const REWARD_HEADERS: [&str; 7] = ["日期", "會員編號", "商品編號", "商品名稱", "數量", "類型", "獎勵"];

/// Report-wide settings
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub store_name: String,
    /// Free text period label, e.g. "113/03"
    pub period: Option<String>,
    /// People to include; `None` means everyone
    pub selected: Option<Vec<String>>,
}

/// Builds report workbooks from aggregated results
pub struct ReportBuilder<'a> {
    mappings: &'a ExportMappings,
    templates: &'a Templates,
    options: &'a ReportOptions,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(
        mappings: &'a ExportMappings,
        templates: &'a Templates,
        options: &'a ReportOptions,
    ) -> Self {
        Self {
            mappings,
            templates,
            options,
        }
    }

    fn is_selected(&self, person: &PersonSummary) -> bool {
        match &self.options.selected {
            Some(names) => names.iter().any(|n| n.trim() == person.name),
            None => true,
        }
    }

    /// Assemble the full workbook
    pub fn build(&self, people: &[PersonSummary], rows: &[Stage1Row]) -> Workbook {
        let mut workbook = Workbook::new();

        for person in people.iter().filter(|p| self.is_selected(p)) {
            let name = workbook.unique_sheet_name(&person.name);
            let template = self.templates.for_role(person.role);
            let mapping = self
                .mappings
                .for_role(person.role)
                .filter(|m| m.is_usable());

            let sheet = match (template, mapping) {
                (Some(template), Some(mapping)) => {
                    debug!("Filling template for {}", person.name);
                    self.template_sheet(template.clone_as(name), mapping, person)
                }
                _ => {
                    if template.is_some() {
                        warn!(
                            "No usable {} mapping; plain layout for {}",
                            person.role, person.name
                        );
                    }
                    self.plain_sheet(Sheet::new(name), person)
                }
            };
            workbook.push(sheet);
        }

        let directory =
            StaffDirectory::new(people.iter().filter_map(|p| p.staff.clone()).collect());
        let matrix = RepurchaseMatrix::build(rows, &directory);
        let name = workbook.unique_sheet_name(MATRIX_SHEET);
        workbook.push(matrix_sheet(name, &matrix));

        info!("Built report with {} sheets", workbook.sheets.len());
        workbook
    }

    fn template_sheet(&self, mut sheet: Sheet, mapping: &RoleMapping, person: &PersonSummary) -> Sheet {
        let cells = &mapping.cells;
        let staff = person.staff.as_ref();
        let stats: [(Option<_>, CellValue); 22] = [
            (cells.store_name, self.options.store_name.as_str().into()),
            (cells.staff_id, staff.map(|s| s.id.clone()).unwrap_or_default().into()),
            (cells.staff_name, person.name.as_str().into()),
            (
                cells.branch,
                staff
                    .and_then(|s| s.branch.clone())
                    .unwrap_or_default()
                    .into(),
            ),
            (cells.role, person.role.label().into()),
            (
                cells.period,
                self.options.period.clone().unwrap_or_default().into(),
            ),
            (cells.total_points, person.total_points().into()),
            (cells.points_standard, optional_number(person.points_standard())),
            (cells.points_gap, optional_number(person.points_gap())),
            (cells.develop_points, person.develop_points.into()),
            (cells.half_year_points, person.half_year_points.into()),
            (cells.return_points, person.return_points.into()),
            (cells.incoming_return_points, person.incoming_return_points.into()),
            (cells.develop_count, person.develop_count.into()),
            (cells.return_count, person.return_count.into()),
            (cells.repurchase_count, person.repurchase_count.into()),
            (cells.cosmetic_total, person.cosmetic_total().into()),
            (cells.cosmetic_standard, optional_number(person.cosmetic_standard())),
            (cells.cosmetic_gap, optional_number(person.cosmetic_gap())),
            (cells.cash_reward, person.cash_reward.into()),
            (cells.voucher_reward, person.voucher_reward.into()),
            (cells.reward_total, person.reward_total().into()),
        ];
        for (cell, value) in stats {
            if let Some(cell) = cell {
                sheet.put(cell.row, cell.col, value);
            }
        }

        if let Some(start_row) = mapping.start_row {
            let columns = &mapping.columns;
            let first = start_row.saturating_sub(1);
            let list: Vec<(&Stage1Row, bool)> = person
                .rows
                .iter()
                .map(|r| (r, false))
                .chain(person.incoming_returns.iter().map(|r| (r, true)))
                .collect();

            write_styled_list(&mut sheet, first, &columns.bound(), list.len(), |i| {
                let (row, incoming) = list[i];
                let mut values: Vec<(Option<ColumnRef>, CellValue)> = vec![
                    (columns.category, row.category.as_str().into()),
                    (columns.date, row.display_date.as_str().into()),
                    (columns.customer_id, row.customer_id.as_str().into()),
                    (
                        columns.customer_name,
                        row.customer_name.clone().unwrap_or_default().into(),
                    ),
                    (columns.item_id, row.item_id.as_str().into()),
                    (columns.item_name, row.item_name.as_str().into()),
                    (columns.quantity, row.quantity.into()),
                    (columns.amount, row.amount.into()),
                    (columns.points, row.calculated_points().into()),
                    (columns.status, row.status.label().into()),
                    (
                        columns.original_developer,
                        row.original_developer.clone().unwrap_or_default().into(),
                    ),
                    (
                        columns.repurchase_type,
                        row.repurchase_type.clone().unwrap_or_default().into(),
                    ),
                ];
                if incoming {
                    values.push((columns.seller, row.sales_person.as_str().into()));
                }
                values
            });
        }

        let rewards = &mapping.rewards;
        if person.role == StaffRole::Sales {
            if let Some(start_row) = rewards.start_row {
                let first = start_row.saturating_sub(1);
                let list = &person.rewards;
                write_styled_list(&mut sheet, first, &rewards.bound(), list.len(), |i| {
                    let reward = &list[i];
                    vec![
                        (rewards.date, reward.date.as_str().into()),
                        (
                            rewards.customer_id,
                            reward.customer_id.clone().unwrap_or_default().into(),
                        ),
                        (rewards.item_id, reward.item_id.as_str().into()),
                        (rewards.item_name, reward.item_name.as_str().into()),
                        (rewards.quantity, reward.quantity.into()),
                        (rewards.reward, reward.total().into()),
                        (rewards.kind, reward.kind.label().into()),
                    ]
                });
            }
        }

        sheet
    }

    fn plain_sheet(&self, mut sheet: Sheet, person: &PersonSummary) -> Sheet {
        let staff = person.staff.as_ref();
        let title_style = CellStyle {
            bold: true,
            font_size: Some(14.0),
            ..Default::default()
        };
        let label_style = CellStyle::bold();

        let title = format!("{} 業績獎金明細", self.options.store_name)
            .trim()
            .to_string();
        sheet.set(0, 0, title, title_style.clone());
        sheet.merge(MergeRange {
            first_row: 0,
            first_col: 0,
            last_row: 0,
            last_col: (LIST_HEADERS.len() - 1) as u16,
        });

        let info: [(&str, CellValue); 5] = [
            ("員工編號", staff.map(|s| s.id.clone()).unwrap_or_default().into()),
            ("姓名", person.name.as_str().into()),
            ("職位", person.role.label().into()),
            (
                "分店",
                staff
                    .and_then(|s| s.branch.clone())
                    .unwrap_or_default()
                    .into(),
            ),
            (
                "期間",
                self.options.period.clone().unwrap_or_default().into(),
            ),
        ];
        let mut row = 2;
        for (label, value) in info {
            sheet.set(row, 0, label, label_style.clone());
            sheet.set(row, 1, value, CellStyle::default());
            row += 1;
        }

        row += 1;
        sheet.set(row, 0, "統計", title_style.clone());
        row += 1;
        let summary: [(&str, CellValue); 16] = [
            ("總點數", person.total_points().into()),
            ("點數標準", optional_number(person.points_standard())),
            ("點數差額", optional_number(person.points_gap())),
            ("開發點數", person.develop_points.into()),
            ("半年點數", person.half_year_points.into()),
            ("退貨點數", person.return_points.into()),
            ("轉入退貨點數", person.incoming_return_points.into()),
            ("開發筆數", person.develop_count.into()),
            ("退貨筆數", person.return_count.into()),
            ("回購筆數", person.repurchase_count.into()),
            ("美妝業績", person.cosmetic_total().into()),
            ("美妝標準", optional_number(person.cosmetic_standard())),
            ("美妝差額", optional_number(person.cosmetic_gap())),
            ("現金獎勵", person.cash_reward.into()),
            ("禮券獎勵", person.voucher_reward.into()),
            ("獎勵合計", person.reward_total().into()),
        ];
        for (label, value) in summary {
            sheet.set(row, 0, label, label_style.clone());
            sheet.set(row, 1, value, CellStyle::bordered());
            row += 1;
        }

        row += 1;
        sheet.set(row, 0, "銷售明細", title_style.clone());
        row += 1;
        row = write_row_section(&mut sheet, row, &person.rows, false);

        if !person.incoming_returns.is_empty() {
            row += 1;
            sheet.set(row, 0, "轉入退貨", title_style.clone());
            row += 1;
            row = write_row_section(&mut sheet, row, &person.incoming_returns, true);
        }

        if !person.category_points.is_empty() {
            row += 1;
            sheet.set(row, 0, "類別小計", title_style.clone());
            row += 1;
            sheet.set(row, 0, "類別", CellStyle::header());
            sheet.set(row, 1, "點數", CellStyle::header());
            row += 1;
            for (category, points) in &person.category_points {
                sheet.set(row, 0, category.as_str(), CellStyle::bordered());
                sheet.set(row, 1, *points, CellStyle::bordered());
                row += 1;
            }
        }

        if !person.rewards.is_empty() {
            row += 1;
            sheet.set(row, 0, "獎勵明細", title_style.clone());
            row += 1;
            row = write_reward_section(&mut sheet, row, &person.rewards);
        }

        if !person.cosmetics.brands.is_empty() {
            row += 1;
            sheet.set(row, 0, "美妝品牌", title_style);
            row += 1;
            sheet.set(row, 0, "品牌", CellStyle::header());
            sheet.set(row, 1, "業績", CellStyle::header());
            row += 1;
            for (brand, amount) in &person.cosmetics.brands {
                sheet.set(row, 0, brand.as_str(), CellStyle::bordered());
                sheet.set(row, 1, *amount, CellStyle::bordered());
                row += 1;
            }
        }

        sheet.set_column_width(0, 14.0);
        sheet.set_column_width(5, 28.0);
        sheet
    }
}

fn optional_number(value: Option<f64>) -> CellValue {
    value.map(CellValue::Number).unwrap_or_default()
}

/// Write `count` list rows from `first`, copying the style of the template's
/// first list row in each bound column
fn write_styled_list<F>(sheet: &mut Sheet, first: u32, bound: &[ColumnRef], count: usize, values: F)
where
    F: Fn(usize) -> Vec<(Option<ColumnRef>, CellValue)>,
{
    let styles: Vec<(u16, CellStyle)> = bound
        .iter()
        .map(|c| (c.index(), sheet.style_at(first, c.index())))
        .collect();
    let style_for = |col: u16| {
        styles
            .iter()
            .find(|(c, _)| *c == col)
            .map(|(_, s)| s.clone())
            .unwrap_or_default()
    };

    for i in 0..count {
        let row = first + i as u32;
        for (column, value) in values(i) {
            if let Some(column) = column {
                sheet.set(row, column.index(), value, style_for(column.index()));
            }
        }
    }
}

fn write_row_section(sheet: &mut Sheet, mut row: u32, rows: &[Stage1Row], incoming: bool) -> u32 {
    let mut headers: Vec<&str> = LIST_HEADERS.to_vec();
    if incoming {
        headers.push("原銷售人員");
    }
    for (col, header) in headers.iter().enumerate() {
        sheet.set(row, col as u16, *header, CellStyle::header());
    }
    row += 1;

    let cell = CellStyle::bordered();
    let mut total = 0;
    for r in rows {
        let points = r.calculated_points();
        total += points;
        let mut values: Vec<CellValue> = vec![
            r.category.as_str().into(),
            r.display_date.as_str().into(),
            r.customer_id.as_str().into(),
            r.customer_name.clone().unwrap_or_default().into(),
            r.item_id.as_str().into(),
            r.item_name.as_str().into(),
            r.quantity.into(),
            r.amount.into(),
            points.into(),
            r.status.label().into(),
            r.original_developer.clone().unwrap_or_default().into(),
            r.repurchase_type.clone().unwrap_or_default().into(),
        ];
        if incoming {
            values.push(r.sales_person.as_str().into());
        }
        for (col, value) in values.into_iter().enumerate() {
            sheet.set(row, col as u16, value, cell.clone());
        }
        row += 1;
    }

    sheet.set(row, 7, "小計", CellStyle::bold());
    sheet.set(row, 8, total, CellStyle::bold());
    row + 1
}

fn write_reward_section(sheet: &mut Sheet, mut row: u32, rewards: &[Stage2Row]) -> u32 {
    for (col, header) in REWARD_HEADERS.iter().enumerate() {
        sheet.set(row, col as u16, *header, CellStyle::header());
    }
    row += 1;

    let cell = CellStyle::bordered();
    for reward in rewards {
        let values: [CellValue; 7] = [
            reward.date.as_str().into(),
            reward.customer_id.clone().unwrap_or_default().into(),
            reward.item_id.as_str().into(),
            reward.item_name.as_str().into(),
            reward.quantity.into(),
            reward.kind.label().into(),
            reward.total().into(),
        ];
        for (col, value) in values.into_iter().enumerate() {
            sheet.set(row, col as u16, value, cell.clone());
        }
        row += 1;
    }
    row
}

/// Sellers down, named developers across
pub fn matrix_sheet(name: String, matrix: &RepurchaseMatrix) -> Sheet {
    let mut sheet = Sheet::new(name);
    let header = CellStyle::header();
    let cell = CellStyle::bordered();
    let total_style = CellStyle {
        bold: true,
        border: true,
        align: Some(Align::Right),
        ..Default::default()
    };

    let total_col = (matrix.developers.len() + 1) as u16;
    sheet.set(0, 0, "銷售人員 \\ 開發者", header.clone());
    for (i, developer) in matrix.developers.iter().enumerate() {
        sheet.set(0, (i + 1) as u16, developer.as_str(), header.clone());
    }
    sheet.set(0, total_col, "合計", header);

    let mut row = 1;
    for line in &matrix.rows {
        sheet.set(row, 0, line.seller.as_str(), cell.clone());
        for (i, developer) in matrix.developers.iter().enumerate() {
            let credit = line.credits.get(developer).copied().unwrap_or(0);
            sheet.set(row, (i + 1) as u16, credit, cell.clone());
        }
        sheet.set(row, total_col, line.total, total_style.clone());
        row += 1;
    }

    sheet.set(row, 0, "合計", total_style.clone());
    for (i, developer) in matrix.developers.iter().enumerate() {
        let total = matrix.totals.get(developer).copied().unwrap_or(0);
        sheet.set(row, (i + 1) as u16, total, total_style.clone());
    }
    sheet.set(row, total_col, matrix.grand_total, total_style);

    sheet.set_column_width(0, 18.0);
    sheet
}

/// Render a workbook and write it to `path` atomically
///
/// The workbook is rendered fully in memory and written to a temporary file
/// next to `path`, which replaces `path` only once complete.
pub fn write_report(writer: &dyn SpreadsheetWriter, workbook: &Workbook, path: &Path) -> Result<()> {
    let bytes = writer.write(workbook)?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(&bytes)?;
    temp.flush()?;
    temp.persist(path)
        .map_err(|e| Error::Io(e.error))?;

    info!("Wrote report {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
