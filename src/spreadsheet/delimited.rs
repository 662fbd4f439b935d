//! Delimited text reports (`.csv`, `.tsv`, `.txt`)
use crate::error::RustySummaryError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::table::LoadedTable;
use crate::spreadsheet::SpreadsheetError;
use csv::ReaderBuilder;
use encoding_rs::UTF_8;

/// Delimiter candidates in tie-break order
const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Number of leading lines inspected when guessing the delimiter
const SNIFF_LINES: usize = 10;

/// Field texts read as null
const NULL_LITERALS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Field texts read as booleans
const BOOLEAN_LITERALS: [&str; 6] = ["True", "TRUE", "true", "False", "FALSE", "false"];

/// Parses delimited text into a table; the first non-blank line is the header.
pub(super) fn read_table(file_name: &str, bytes: &[u8]) -> Result<LoadedTable, RustySummaryError> {
    // Sniffs a UTF-8 or UTF-16 BOM, falls back to UTF-8 with replacement characters
    let (text, _, _) = UTF_8.decode(bytes);
    let delimiter = detect_delimiter(&text);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut sheet = Sheet::new(file_name, file_name);
    let mut width = None;
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let header_width = *width.get_or_insert(record.len());
        if record.len() > header_width {
            let line = record.position().map(|position| position.line()).unwrap_or(row as u64 + 1);
            Err(SpreadsheetError::RecordLengthError(
                file_name.to_owned(),
                line as usize,
                header_width,
                record.len(),
            ))?
        }
        for (col, field) in record.iter().enumerate() {
            let trimmed = field.trim();
            let kind = if row == 0 {
                CellType::InlineString
            } else if NULL_LITERALS.contains(&field) {
                CellType::Empty
            } else if BOOLEAN_LITERALS.contains(&trimmed) {
                CellType::Boolean
            } else if trimmed.parse::<f64>().map(f64::is_finite).unwrap_or(false) {
                CellType::Number
            } else {
                CellType::InlineString
            };
            let value = match kind {
                CellType::Boolean | CellType::Number => trimmed,
                _ => field,
            };
            if kind == CellType::Empty || field.is_empty() {
                sheet.extend_bound(row, col);
            } else {
                sheet.push(Cell {
                    row,
                    col,
                    kind,
                    value: value.to_owned(),
                });
            }
        }
    }
    // A header-only file still has its columns
    if let Some(width) = width.filter(|width| *width > 0) {
        sheet.extend_bound(0, 0);
        sheet.extend_bound(0, width - 1);
    }
    sheet.into_table(&[])
}

/// Picks the candidate that appears on every sampled line, preferring a steady per-line count.
fn detect_delimiter(text: &str) -> u8 {
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    let mut best = (DELIMITERS[0], 0usize);
    for delimiter in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| line.bytes().filter(|byte| *byte == delimiter).count())
            .collect();
        let min_count = counts.iter().copied().min().unwrap_or(0);
        let max_count = counts.iter().copied().max().unwrap_or(0);
        if min_count == 0 {
            continue;
        }
        let consistency = if max_count == min_count {
            100
        } else if max_count - min_count <= 1 {
            50
        } else {
            10
        };
        let score = min_count * consistency;
        if score > best.1 {
            best = (delimiter, score);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::Value;

    fn text(value: &str) -> Value {
        Value::Text(value.to_owned())
    }

    #[test]
    fn delimiter_detection() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3\n"), b',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2,5\t3\n"), b'\t');
        assert_eq!(detect_delimiter("a;b\n1;2\n\n3;4\n"), b';');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3\n"), b'|');
        assert_eq!(detect_delimiter("single column\n1\n"), b',');
    }

    #[test]
    fn fields_are_typed() {
        let csv = "Programmatic channel,Ad Exchange impressions,Ad Exchange revenue ($)\n\
                   Open Auction,1200,3.50\n\
                   Private Auction,N/A,\n";
        let table = read_table("Daily-AdX_2024.csv", csv.as_bytes()).unwrap();
        assert_eq!(table.row_count, 2);
        assert_eq!(table.columns[0].values, [text("Open Auction"), text("Private Auction")]);
        assert_eq!(table.columns[1].values, [Value::Number(1200.0), Value::Empty]);
        assert_eq!(table.columns[2].values, [Value::Number(3.5), Value::Empty]);
    }

    #[test]
    fn padded_numbers_and_boolean_literals() {
        let csv = "Impressions,Viewable,Label\n 100 ,True, north \n2.5\t,false,TRUE story\n";
        let table = read_table("Xandr.csv", csv.as_bytes()).unwrap();
        assert_eq!(table.columns[0].values, [Value::Number(100.0), Value::Number(2.5)]);
        assert_eq!(table.columns[1].values, [Value::Bool(true), Value::Bool(false)]);
        assert_eq!(table.columns[2].values, [text(" north "), text("TRUE story")]);
    }

    #[test]
    fn header_is_never_converted() {
        let table = read_table("r.csv", b"2024,NA\n1,2\n").unwrap();
        assert_eq!(table.columns[0].name, "2024");
        assert_eq!(table.columns[1].name, "NA");
    }

    #[test]
    fn bom_and_utf16_are_decoded() {
        let table = read_table("r.csv", b"\xEF\xBB\xBFImpressions\n5\n").unwrap();
        assert_eq!(table.columns[0].name, "Impressions");

        let mut utf16 = vec![0xFF, 0xFE];
        for unit in "Earnings\n7\n".encode_utf16() {
            utf16.extend_from_slice(&unit.to_le_bytes());
        }
        let table = read_table("r.csv", &utf16).unwrap();
        assert_eq!(table.columns[0].name, "Earnings");
        assert_eq!(table.columns[0].values, [Value::Number(7.0)]);
    }

    #[test]
    fn trailing_empty_columns_and_rows_are_kept() {
        let table = read_table("r.csv", b"a,b,\n1,,\n,,\n").unwrap();
        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.columns[2].name, "Unnamed: 2");
        assert_eq!(table.row_count, 2);
        assert_eq!(table.columns[0].values, [Value::Number(1.0), Value::Empty]);
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let table = read_table("r.csv", b"Impressions,Net Revenue\n").unwrap();
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.row_count, 0);
    }

    #[test]
    fn long_record_is_an_error() {
        let error = read_table("r.csv", b"a,b\n1,2,3\n").unwrap_err();
        assert!(error.to_string().contains("expected at most 2"));
    }

    #[test]
    fn empty_file_is_an_empty_table() {
        assert_eq!(read_table("r.csv", b"").unwrap(), LoadedTable::default());
    }
}
