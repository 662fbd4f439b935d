//! # Table Loader
//!
//! Turns one archive entry into a [`LoadedTable`]. Delimited text entries (`.csv`, `.tsv`,
//! `.txt`) go through the CSV reader; everything else is treated as an xlsx workbook.
//! The first row of the selected sheet is the header and every later row is a record.
mod cell;
mod delimited;
mod excel;
mod reference;
mod sheet;
mod table;
mod xlsx;

use crate::archive::ArchiveEntry;
use crate::error::RustySummaryError;
use sheet::Sheet;
use thiserror::Error;
use tracing::debug;

pub use table::normalize_name;
pub use table::LoadedTable;
pub use table::TableColumn;
pub use table::Value;

/// Extensions read as delimited text
const TEXT_EXTENSIONS: [&str; 3] = [".csv", ".tsv", ".txt"];

/// Errors raised while reading a single source report
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// A required package part is missing
    #[error("Missing part '{0}'")]
    FileError(String),

    /// The requested worksheet does not exist
    #[error("Sheet '{1}' not found in '{0}'")]
    SheetNotFoundError(String, String),

    /// The workbook declares no worksheets
    #[error("Workbook '{0}' has no worksheets")]
    SpreadsheetEmptyError(String),

    /// The bytes are neither an xlsx package nor delimited text
    #[error("Unsupported file format '{0}'")]
    UnsupportedFormatError(String),

    /// Encrypted OOXML package
    #[error("Workbook '{0}' is password protected")]
    PasswordProtectedError(String),

    /// A cell value cannot be decoded for its declared type
    #[error("Invalid cell value in '{0}' sheet '{1}' at {2}: '{3}'")]
    CellValueError(String, String, String, String),

    /// A delimited record has more fields than the header
    #[error("Record {1} of '{0}' has {3} fields, expected at most {2}")]
    RecordLengthError(String, usize, usize, usize),

    /// A date-formatted number outside the representable calendar
    #[error("Date serial '{0}' is out of range")]
    DateRangeError(String),
}

/// A source report that could not be parsed, carrying the entry name it came from
#[derive(Error, Debug)]
#[error("Load '{entry}' failed: {source}")]
pub struct LoadError {
    pub entry: String,
    #[source]
    pub source: RustySummaryError,
}

/// Common interface of the workbook readers
pub(crate) trait Spreadsheet {
    /// File name of the workbook
    fn name(&self) -> String;

    /// Worksheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Loads the shared string table, empty when the workbook has none
    fn load_shared_strings(&mut self) -> Result<Vec<String>, RustySummaryError>;

    /// Reads the cells of one worksheet
    fn read_sheet(&mut self, sheet_name: &str) -> Result<Sheet, RustySummaryError>;

    /// Reads the selected worksheet (the first one when `sheet_selector` is `None`) as a table
    fn read_table(&mut self, sheet_selector: Option<&str>) -> Result<LoadedTable, RustySummaryError> {
        let sheet_name = match sheet_selector {
            Some(name) => name.to_owned(),
            None => self
                .sheet_names()
                .into_iter()
                .next()
                .ok_or_else(|| SpreadsheetError::SpreadsheetEmptyError(self.name()))?,
        };
        let sheet = self.read_sheet(&sheet_name)?;
        let shared_strings = if sheet.cells.iter().any(|cell| cell.kind == cell::CellType::SharedString) {
            self.load_shared_strings()?
        } else {
            Vec::new()
        };
        sheet.into_table(&shared_strings)
    }
}

/// Returns true when the entry name marks a delimited text report
fn is_delimited_text(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    TEXT_EXTENSIONS.iter().any(|extension| lower.ends_with(extension))
}

/// Parses an archive entry into a table.
///
/// `sheet_selector` only applies to workbooks; delimited text has a single table.
pub fn load(entry: &ArchiveEntry, sheet_selector: Option<&str>) -> Result<LoadedTable, LoadError> {
    let result = if is_delimited_text(&entry.name) {
        delimited::read_table(&entry.name, &entry.bytes)
    } else {
        xlsx::XlsxSpreadsheet::from_bytes(&entry.name, &entry.bytes)
            .and_then(|mut spreadsheet| spreadsheet.read_table(sheet_selector))
    };
    match result {
        Ok(table) => {
            debug!(entry = %entry.name, columns = table.columns.len(), rows = table.row_count, "Loaded table");
            Ok(table)
        }
        Err(source) => Err(LoadError {
            entry: entry.name.to_owned(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn entry(name: &str, bytes: Vec<u8>) -> ArchiveEntry {
        ArchiveEntry {
            name: name.to_owned(),
            bytes,
        }
    }

    fn workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let first = workbook.add_worksheet();
        first.set_name("Summary").unwrap();
        first.write_string(0, 0, "Total").unwrap();
        first.write_number(1, 0, 9).unwrap();
        let second = workbook.add_worksheet();
        second.set_name("Report data").unwrap();
        second.write_string(0, 0, "Ad Exchange impressions").unwrap();
        second.write_number(1, 0, 10).unwrap();
        second.write_number(2, 0, 20).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn extension_decides_the_reader() {
        assert!(is_delimited_text("Pubmatic.CSV"));
        assert!(is_delimited_text("exports/TripleLift.tsv"));
        assert!(is_delimited_text("notes.txt"));
        assert!(!is_delimited_text("Magnite.xlsx"));
    }

    #[test]
    fn load_selects_named_sheet() {
        let table = load(&entry("AdX_report.xlsx", workbook()), Some("Report data")).unwrap();
        assert_eq!(table.columns[0].name, "Ad Exchange impressions");
        assert_eq!(table.row_count, 2);
    }

    #[test]
    fn load_defaults_to_first_sheet() {
        let table = load(&entry("AdX_report.xlsx", workbook()), None).unwrap();
        assert_eq!(table.columns[0].name, "Total");
        assert_eq!(table.columns[0].values, [Value::Number(9.0)]);
    }

    #[test]
    fn load_errors_name_the_entry() {
        let error = load(&entry("AdX_report.xlsx", workbook()), Some("Missing")).unwrap_err();
        assert_eq!(error.entry, "AdX_report.xlsx");
        assert!(error.to_string().contains("Missing"));

        let error = load(&entry("Magnite.xlsx", b"garbage".to_vec()), None).unwrap_err();
        assert!(matches!(
            error.source,
            RustySummaryError::SpreadsheetError(SpreadsheetError::UnsupportedFormatError(_))
        ));
    }

    #[test]
    fn load_reads_delimited_text() {
        let table = load(&entry("Pubmatic.csv", b"Date,Revenue\n2024-01-01,1.5\n".to_vec()), None).unwrap();
        assert_eq!(table.columns[1].values, [Value::Number(1.5)]);
    }
}
