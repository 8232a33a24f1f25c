//! XLSX rendering of the workbook model

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook as XlsxWorkbook};

use super::workbook::{Align, CellStyle, CellValue, Sheet, Workbook};
use crate::error::Result;

/// Renders a [`Workbook`] into a binary spreadsheet
pub trait SpreadsheetWriter {
    fn write(&self, workbook: &Workbook) -> Result<Vec<u8>>;
}

/// `rust_xlsxwriter` implementation of [`SpreadsheetWriter`]
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxWriter;

fn to_format(style: &CellStyle) -> Format {
    let mut format = Format::new();
    if style.bold {
        format = format.set_bold();
    }
    if style.italic {
        format = format.set_italic();
    }
    if let Some(size) = style.font_size {
        format = format.set_font_size(size);
    }
    if let Some(color) = style.font_color {
        format = format.set_font_color(Color::RGB(color));
    }
    if let Some(color) = style.background {
        format = format.set_background_color(Color::RGB(color));
    }
    if let Some(align) = style.align {
        format = format.set_align(match align {
            Align::Left => FormatAlign::Left,
            Align::Center => FormatAlign::Center,
            Align::Right => FormatAlign::Right,
        });
    }
    if style.border {
        format = format.set_border(FormatBorder::Thin);
    }
    if let Some(num_format) = &style.num_format {
        format = format.set_num_format(num_format);
    }
    format
}

fn cell_text(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Number(n) => n.to_string(),
        CellValue::Text(s) => s.clone(),
    }
}

fn write_sheet(workbook: &mut XlsxWorkbook, sheet: &Sheet) -> Result<()> {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&sheet.name)?;

    for (&col, &width) in &sheet.column_widths {
        worksheet.set_column_width(col, width)?;
    }
    for (&row, &height) in &sheet.row_heights {
        worksheet.set_row_height(row, height)?;
    }

    for range in &sheet.merges {
        let anchor = sheet.get(range.first_row, range.first_col);
        let text = anchor.map(|c| cell_text(&c.value)).unwrap_or_default();
        let format = anchor.map(|c| to_format(&c.style)).unwrap_or_default();
        worksheet.merge_range(
            range.first_row,
            range.first_col,
            range.last_row,
            range.last_col,
            &text,
            &format,
        )?;
    }

    for (&(row, col), cell) in &sheet.cells {
        if sheet.merges.iter().any(|m| m.contains(row, col)) {
            continue;
        }
        let format = to_format(&cell.style);
        match &cell.value {
            CellValue::Number(n) => {
                worksheet.write_number_with_format(row, col, *n, &format)?;
            }
            CellValue::Text(s) => {
                worksheet.write_string_with_format(row, col, s, &format)?;
            }
            CellValue::Empty if !cell.style.is_plain() => {
                worksheet.write_blank(row, col, &format)?;
            }
            CellValue::Empty => {}
        }
    }

    Ok(())
}

impl SpreadsheetWriter for XlsxWriter {
    fn write(&self, workbook: &Workbook) -> Result<Vec<u8>> {
        let mut xlsx = XlsxWorkbook::new();
        for sheet in &workbook.sheets {
            write_sheet(&mut xlsx, sheet)?;
        }
        Ok(xlsx.save_to_buffer()?)
    }
}
