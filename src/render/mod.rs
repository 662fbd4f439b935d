//! # Hierarchical Spreadsheet Writer
//!
//! Writes an [`AssembledTable`] as a single `Summary` worksheet. The first three rows carry the
//! column key: source label (merged across adjacent equal labels), metric and breakdown. Data
//! starts on the fourth row, below frozen panes, with an autofilter on the breakdown row.
use crate::assemble::AssembledTable;
use crate::extract::ColumnKey;
use crate::extract::Slot;
use crate::spreadsheet::Value;
use rust_xlsxwriter::Color;
use rust_xlsxwriter::DocProperties;
use rust_xlsxwriter::ExcelDateTime;
use rust_xlsxwriter::Format;
use rust_xlsxwriter::FormatAlign;
use rust_xlsxwriter::FormatBorder;
use rust_xlsxwriter::Workbook;
use rust_xlsxwriter::Worksheet;
use rust_xlsxwriter::XlsxError;
use thiserror::Error;
use tracing::info;

/// Name of the only worksheet
pub const SHEET_NAME: &str = "Summary";

/// Rows taken by the three-level header
const HEADER_ROWS: u32 = 3;

/// Width of every column, in character units
const COLUMN_WIDTH: u16 = 30;

/// Fill of the source label row
const LABEL_FILL: u32 = 0xDCE6F1;

/// Worksheet limits of the xlsx format
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

/// Errors raised while writing the summary workbook
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{0}")]
    XlsxError(#[from] XlsxError),

    #[error("Summary has {0} data rows, more than a worksheet holds")]
    TooManyRows(usize),

    #[error("Summary has {0} columns, more than a worksheet holds")]
    TooManyColumns(usize),
}

/// Cell formats of the summary sheet
struct Formats {
    label: Format,
    metric: Format,
    breakdown: Format,
    data: Format,
}

impl Formats {
    fn new() -> Self {
        let header = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_text_wrap();
        Self {
            label: header.clone().set_background_color(Color::RGB(LABEL_FILL)),
            metric: header.clone(),
            breakdown: header,
            data: Format::new().set_align(FormatAlign::Center),
        }
    }
}

/// Renders the table into the bytes of an xlsx file
pub fn render(table: &AssembledTable) -> Result<Vec<u8>, RenderError> {
    let column_count = table.column_count();
    if column_count > MAX_COLUMNS {
        return Err(RenderError::TooManyColumns(column_count));
    }
    if table.row_count > MAX_ROWS - HEADER_ROWS as usize {
        return Err(RenderError::TooManyRows(table.row_count));
    }
    let last_col = u16::try_from(column_count.saturating_sub(1))
        .map_err(|_| RenderError::TooManyColumns(column_count))?;
    let last_row = u32::try_from(table.row_count)
        .map_err(|_| RenderError::TooManyRows(table.row_count))?
        + HEADER_ROWS
        - 1;

    let formats = Formats::new();
    let mut workbook = Workbook::new();
    // Pinned so that the same table always yields the same bytes
    let created = ExcelDateTime::from_ymd(2000, 1, 1)?;
    workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;
    write_header(worksheet, &table.columns, &formats)?;
    for (col, (_, slots)) in table.columns.iter().enumerate() {
        let col = col as u16;
        for (row, slot) in slots.iter().enumerate() {
            write_slot(worksheet, row as u32 + HEADER_ROWS, col, slot, &formats.data)?;
        }
    }

    worksheet.set_freeze_panes(HEADER_ROWS, 0)?;
    if column_count > 0 {
        worksheet.autofilter(HEADER_ROWS - 1, 0, last_row, last_col)?;
    }
    for col in 0..column_count as u16 {
        worksheet.set_column_width(col, COLUMN_WIDTH)?;
    }

    let bytes = workbook.save_to_buffer()?;
    info!(columns = column_count, rows = table.row_count, size = bytes.len(), "Rendered summary workbook");
    Ok(bytes)
}

/// Writes the source, metric and breakdown rows
fn write_header(worksheet: &mut Worksheet, columns: &[(ColumnKey, Vec<Slot>)], formats: &Formats) -> Result<(), RenderError> {
    let mut start = 0usize;
    while start < columns.len() {
        let label = &columns[start].0.source_label;
        let span = columns[start..]
            .iter()
            .take_while(|(key, _)| key.source_label == *label)
            .count();
        let first = start as u16;
        let last = (start + span - 1) as u16;
        if span > 1 {
            worksheet.merge_range(0, first, 0, last, label, &formats.label)?;
        } else {
            worksheet.write_string_with_format(0, first, label, &formats.label)?;
        }
        start += span;
    }

    for (col, (key, _)) in columns.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(1, col, &key.metric, &formats.metric)?;
        if key.breakdown.is_empty() {
            worksheet.write_blank(2, col, &formats.breakdown)?;
        } else {
            worksheet.write_string_with_format(2, col, &key.breakdown, &formats.breakdown)?;
        }
    }
    Ok(())
}

/// Writes one data cell; missing and blank slots become formatted empty cells
fn write_slot(worksheet: &mut Worksheet, row: u32, col: u16, slot: &Slot, format: &Format) -> Result<(), RenderError> {
    match slot {
        Slot::Value(Value::Number(number)) => {
            worksheet.write_number_with_format(row, col, *number, format)?;
        }
        Slot::Value(Value::Text(text)) => {
            worksheet.write_string_with_format(row, col, text, format)?;
        }
        Slot::Value(Value::Bool(boolean)) => {
            worksheet.write_boolean_with_format(row, col, *boolean, format)?;
        }
        Slot::Value(Value::Empty) | Slot::Missing | Slot::Blank => {
            worksheet.write_blank(row, col, format)?;
        }
    }
    Ok(())
}
