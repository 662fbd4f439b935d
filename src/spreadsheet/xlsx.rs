use crate::error::RustySummaryError;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");   // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content

/// An xlsx workbook opened from any seekable byte source
pub(crate) struct XlsxSpreadsheet<RS: Read + Seek> {
    /// File name of the workbook, used in messages
    pub(crate) name: String,
    /// ZIP package holding the workbook parts
    zip: ZipArchive<RS>,
    /// Cell types indexed by style id
    number_formats: Vec<CellType>,
    /// Worksheets in workbook order as (name, part path) pairs
    sheets: Vec<(String, String)>,
}

impl<'a> XlsxSpreadsheet<Cursor<&'a [u8]>> {
    /// Opens a workbook held in memory
    pub(crate) fn from_bytes(file_name: &str, bytes: &'a [u8]) -> Result<Self, RustySummaryError> {
        excel::check_signature(file_name, bytes)?;
        Self::open(file_name, Cursor::new(bytes))
    }
}

impl<RS: Read + Seek> XlsxSpreadsheet<RS> {
    /// Opens the package and reads the workbook structure and number formats
    pub(crate) fn open(file_name: &str, reader: RS) -> Result<Self, RustySummaryError> {
        let mut zip = ZipArchive::new(reader)?;
        let (sheets, is_1904) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip, is_1904)?;
        Ok(XlsxSpreadsheet {
            name: file_name.to_owned(),
            zip,
            number_formats,
            sheets,
        })
    }

    /// Part path of the named worksheet
    fn sheet_path(&self, sheet_name: &str) -> Option<String> {
        self.sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, path)| path.to_owned())
    }
}

impl<RS: Read + Seek> Spreadsheet for XlsxSpreadsheet<RS> {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// Shared strings are stored once in `xl/sharedStrings.xml` and referenced by index
    fn load_shared_strings(&mut self) -> Result<Vec<String>, RustySummaryError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                shared_strings.push(reader.read_text(TAG_SHARED_STRING_ITEM, false)?);
            }
        });
        Ok(shared_strings)
    }

    /// Streams one worksheet part into a [`Sheet`], keeping every cell that carries a value
    fn read_sheet(&mut self, sheet_name: &str) -> Result<Sheet, RustySummaryError> {
        let zip_path = self.sheet_path(sheet_name).ok_or_else(|| SpreadsheetError::SheetNotFoundError(
            self.name.to_owned(),
            sheet_name.to_owned(),
        ))?;
        let mut sheet = Sheet::new(&self.name, sheet_name);
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut reader = self.zip
            .xml_reader(&zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(number) = event.get_attribute_value("r")? {
                    row_count = number.parse::<usize>()?.saturating_sub(1);
                }
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => {
                row_count += 1;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count, col_count));
                col_count = col + 1;
                value.clear();
                kind = event.get_attribute_value("t")?.map(|t| {
                    match t.as_ref() {
                        "inlineStr" | "str" => CellType::InlineString,
                        "s" => CellType::SharedString,
                        "d" => CellType::IsoDateTime,
                        "b" => CellType::Boolean,
                        "e" => CellType::Error,
                        _ => CellType::Number,
                    }
                }).unwrap_or(CellType::Number);
                if kind == CellType::Number {
                    if let Some(format_id) = event.get_attribute_value("s")?.filter(|id| !id.is_empty()) {
                        let index = format_id.parse::<usize>()?;
                        kind = self.number_formats.get(index).copied().unwrap_or(CellType::Number);
                    }
                }
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = reader.read_text(TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = reader.read_text(TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if !value.is_empty() {
                    sheet.push(Cell {
                        row,
                        col,
                        kind,
                        value: std::mem::take(&mut value),
                    });
                }
                kind = CellType::default();
            }
        });
        Ok(sheet)
    }
}

/// Loads the worksheet list and the date system from `xl/workbook.xml`
///
/// # Returns
/// Tuple of (worksheets, is_1904_date_system) where worksheets are (name, zip_path) pairs
fn load_workbook<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<(Vec<(String, String)>, bool), RustySummaryError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let name = event.get_attribute_value("name")?;
            let id = event.get_local_attribute_value(b"id")?;
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads number formats and cell style indexes from `xl/styles.xml`
/// so date-formatted numbers can be told apart from plain ones.
fn load_number_formats<RS: Read + Seek>(zip: &mut ZipArchive<RS>, is_1904: bool) -> Result<Vec<CellType>, RustySummaryError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                let style = CellType::parse_custom_number_format(&format, is_1904);
                custom_formats.insert(id.to_string(), style);
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.try_get_attribute("numFmtId")?
                .map(|attribute| attribute.get_value())
                .transpose()?
                .unwrap_or_default();
            format_indexes.push(id.to_string());
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{Format, Workbook};

    fn workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let date = Format::new().set_num_format("yyyy-mm-dd");

        let notes = workbook.add_worksheet();
        notes.set_name("Notes").unwrap();
        notes.write_string(0, 0, "generated").unwrap();

        let report = workbook.add_worksheet();
        report.set_name("Report").unwrap();
        report.write_string(0, 0, "Date").unwrap();
        report.write_string(0, 1, "Paid Impressions").unwrap();
        report.write_string(0, 2, "Publisher Net Revenue").unwrap();
        report.write_number_with_format(1, 0, 45292, &date).unwrap();
        report.write_number(1, 1, 1200).unwrap();
        report.write_number(1, 2, 3.5).unwrap();
        report.write_number_with_format(2, 0, 45293, &date).unwrap();
        report.write_number(2, 1, 800).unwrap();
        report.write_boolean(2, 2, true).unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn lists_sheets_in_workbook_order() {
        let bytes = workbook();
        let spreadsheet = XlsxSpreadsheet::from_bytes("Magnite.xlsx", &bytes).unwrap();
        assert_eq!(spreadsheet.sheet_names(), ["Notes", "Report"]);
    }

    #[test]
    fn reads_typed_cells() {
        let bytes = workbook();
        let mut spreadsheet = XlsxSpreadsheet::from_bytes("Magnite.xlsx", &bytes).unwrap();
        let strings = spreadsheet.load_shared_strings().unwrap();
        let sheet = spreadsheet.read_sheet("Report").unwrap();
        assert_eq!(sheet.row_upper_bound, Some(2));
        assert_eq!(sheet.col_upper_bound, Some(2));

        let table = sheet.into_table(&strings).unwrap();
        assert_eq!(table.row_count, 2);
        assert_eq!(table.columns[0].values[0].to_string(), "2024-01-01");
        assert_eq!(table.columns[1].name, "Paid Impressions");
        assert_eq!(table.columns[1].values[1].to_string(), "800");
        assert_eq!(table.columns[2].values[0].to_string(), "3.5");
        assert_eq!(table.columns[2].values[1].to_string(), "true");
    }

    #[test]
    fn missing_sheet_is_an_error() {
        let bytes = workbook();
        let mut spreadsheet = XlsxSpreadsheet::from_bytes("Magnite.xlsx", &bytes).unwrap();
        let error = spreadsheet.read_sheet("Report data").err().unwrap();
        assert!(error.to_string().contains("Report data"));
    }
}
