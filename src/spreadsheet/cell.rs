use crate::error::RustySummaryError;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::table::Value;
use crate::spreadsheet::SpreadsheetError;
use chrono::NaiveDate;
use chrono::TimeDelta;

/// Types of cell data in spreadsheet files.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values stored as `1`/`0`
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline string values (also formula string results and CSV text)
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values such as `#N/A`
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Looks for date/time tokens outside of literals, escapes and `[...]` sections.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_bracket = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }
}

/// Represents a single cell in a spreadsheet with position, type, and raw value.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Cell data type
    pub(crate) kind: CellType,
    /// Raw cell value as stored in the file (a string index for shared strings)
    pub(crate) value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Resolves the raw value into a table value.
    ///
    /// Date-formatted numbers become ISO-8601 text; shared strings are looked up in
    /// `shared_strings`. `sheet` and `file_name` only feed error messages.
    pub(crate) fn to_value(&self, shared_strings: &[String], file_name: &str, sheet: &str) -> Result<Value, RustySummaryError> {
        let invalid = || SpreadsheetError::CellValueError(
            file_name.to_owned(),
            sheet.to_owned(),
            self.reference(),
            self.value.to_owned(),
        );
        let value = match self.kind {
            CellType::Empty => Value::Empty,
            CellType::Boolean => Value::Bool(self.value == "1" || self.value.eq_ignore_ascii_case("true")),
            CellType::Number => Value::Number(self.value.trim().parse::<f64>().map_err(|_| invalid())?),
            CellType::NumberDateTime1900 => Value::Text(to_datetime_string(&self.value, false).map_err(|_| invalid())?),
            CellType::NumberDateTime1904 => Value::Text(to_datetime_string(&self.value, true).map_err(|_| invalid())?),
            CellType::NumberDate1900 => Value::Text(to_date_string(&self.value, false).map_err(|_| invalid())?),
            CellType::NumberDate1904 => Value::Text(to_date_string(&self.value, true).map_err(|_| invalid())?),
            CellType::NumberTime1900 | CellType::NumberTime1904 => {
                Value::Text(to_time_string(&self.value).map_err(|_| invalid())?)
            }
            CellType::IsoDateTime => Value::Text(self.value.replace('T', " ")),
            CellType::SharedString => {
                let index = self.value.parse::<usize>().map_err(|_| invalid())?;
                Value::Text(shared_strings.get(index).ok_or_else(invalid)?.to_owned())
            }
            CellType::InlineString | CellType::Error => Value::Text(self.value.to_owned()),
        };
        Ok(value)
    }
}

/// Converts Excel numeric date to ISO date string.
/// Handles the Lotus 1-2-3 leap year bug for the 1900 epoch.
/// Serials outside the representable date range are rejected.
fn to_date_string(value: &str, is_1904: bool) -> Result<String, RustySummaryError> {
    let serial = value.parse::<f64>()?;
    let out_of_range = || SpreadsheetError::DateRangeError(value.to_owned());
    if !serial.is_finite() {
        Err(out_of_range())?
    }
    let days = serial.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let date = days
        .checked_add(offset)
        .and_then(TimeDelta::try_days)
        .and_then(|duration| NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(duration))
        .ok_or_else(out_of_range)?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Converts the fractional part of an Excel number to an ISO time string.
fn to_time_string(value: &str) -> Result<String, RustySummaryError> {
    let factor = value.parse::<f64>()?.fract();
    let mut remainder = (factor * 86_400_000f64).round() as i64;
    let milliseconds = remainder % 1_000;
    remainder /= 1_000;
    let seconds = remainder % 60;
    remainder /= 60;
    let minutes = remainder % 60;
    let hours = remainder / 60;
    let timestamp = if milliseconds > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{milliseconds:03}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    };
    Ok(timestamp)
}

/// Converts Excel numeric datetime to ISO datetime string.
fn to_datetime_string(value: &str, is_1904: bool) -> Result<String, RustySummaryError> {
    let date = to_date_string(value, is_1904)?;
    let time = to_time_string(value)?;
    Ok(format!("{date} {time}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell {
            row: 1,
            col: 2,
            kind,
            value: value.to_owned(),
        }
    }

    #[test]
    fn custom_formats_detect_dates() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd", false), CellType::NumberDate1900);
        assert_eq!(CellType::parse_custom_number_format("d/m/yy h:mm", true), CellType::NumberDateTime1904);
        assert_eq!(CellType::parse_custom_number_format("[$$-409]#,##0.00", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("\"days\" 0", false), CellType::Number);
    }

    #[test]
    fn dates_render_as_iso_text() {
        let values = [
            (cell(CellType::NumberDate1900, "45292"), "2024-01-01"),
            (cell(CellType::NumberDateTime1900, "45292.5"), "2024-01-01 12:00:00"),
            (cell(CellType::NumberTime1900, "0.25"), "06:00:00"),
            (cell(CellType::NumberDate1904, "0"), "1904-01-01"),
        ];
        for (cell, expected) in values {
            assert_eq!(cell.to_value(&[], "f.xlsx", "S").unwrap(), Value::Text(expected.to_owned()));
        }
    }

    #[test]
    fn shared_strings_are_resolved() {
        let strings = vec!["Open Auction".to_owned()];
        let value = cell(CellType::SharedString, "0").to_value(&strings, "f.xlsx", "S").unwrap();
        assert_eq!(value, Value::Text("Open Auction".to_owned()));

        let error = cell(CellType::SharedString, "4").to_value(&strings, "f.xlsx", "S").unwrap_err();
        assert!(error.to_string().contains("C2"));
    }

    #[test]
    fn numbers_and_booleans() {
        assert_eq!(cell(CellType::Number, "12.5").to_value(&[], "", "").unwrap(), Value::Number(12.5));
        assert_eq!(cell(CellType::Boolean, "1").to_value(&[], "", "").unwrap(), Value::Bool(true));
        assert!(cell(CellType::Number, "n/a").to_value(&[], "", "").is_err());
    }

    #[test]
    fn out_of_range_dates_are_cell_errors() {
        for value in ["100000000", "-100000000", "1e300", "inf"] {
            let error = cell(CellType::NumberDate1900, value).to_value(&[], "Magnite.xlsx", "Report").unwrap_err();
            assert!(matches!(
                error,
                RustySummaryError::SpreadsheetError(SpreadsheetError::CellValueError(_, _, _, _))
            ));
        }
        assert!(cell(CellType::NumberDateTime1904, "1e20").to_value(&[], "", "").is_err());
        assert_eq!(
            cell(CellType::NumberDate1900, "2958465").to_value(&[], "", "").unwrap(),
            Value::Text("9999-12-31".to_owned())
        );
    }
}
