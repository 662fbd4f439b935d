use crate::error::RustySummaryError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::table::LoadedTable;
use crate::spreadsheet::table::Value;

/// Cells collected from one worksheet (or one delimited file) before they are shaped into a table.
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// Non-empty cells in the order they were read
    pub(crate) cells: Vec<Cell>,
    /// Occupied range, `None` until the first cell arrives
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(super) fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
            row_lower_bound: None,
            row_upper_bound: None,
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    /// Returns true if the sheet contains no cells.
    pub(super) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds a cell to the sheet, growing the occupied range.
    pub(super) fn push(&mut self, cell: Cell) {
        self.extend_bound(cell.row, cell.col);
        self.cells.push(cell);
    }

    /// Grows the occupied range to cover (row, col) without storing a value.
    /// Delimited files use this for empty fields so that blank trailing columns and
    /// rows of empty fields keep their place.
    pub(super) fn extend_bound(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.map(|lower| row < lower).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|upper| upper < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_lower_bound.map(|lower| col < lower).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|upper| upper < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Shapes the cells into a table: the first occupied row is the header, every
    /// following row up to the last occupied one is a record.
    pub(crate) fn into_table(self, shared_strings: &[String]) -> Result<LoadedTable, RustySummaryError> {
        let (Some(row_lower), Some(row_upper), Some(col_lower), Some(col_upper)) = (
            self.row_lower_bound,
            self.row_upper_bound,
            self.col_lower_bound,
            self.col_upper_bound,
        ) else {
            return Ok(LoadedTable::default());
        };

        let width = col_upper - col_lower + 1;
        let mut header = vec![String::new(); width];
        let mut rows = vec![vec![Value::Empty; width]; row_upper - row_lower];
        for cell in &self.cells {
            let value = cell.to_value(shared_strings, &self.file_name, &self.name)?;
            let col = cell.col - col_lower;
            if cell.row == row_lower {
                header[col] = value.to_string();
            } else {
                rows[cell.row - row_lower - 1][col] = value;
            }
        }
        Ok(LoadedTable::from_rows(header, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;

    fn push(sheet: &mut Sheet, row: usize, col: usize, value: &str) {
        sheet.push(Cell {
            row,
            col,
            kind: CellType::InlineString,
            value: value.to_owned(),
        });
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("", "");

        assert!(sheet.is_empty());
        assert_eq!(sheet.row_lower_bound, None);
        assert_eq!(sheet.col_upper_bound, None);
        assert_eq!(sheet.into_table(&[]).unwrap(), LoadedTable::default());
    }

    #[test]
    fn sheet_bounds_follow_cells() {
        let mut sheet = Sheet::new("", "");
        push(&mut sheet, 1, 1, "a");
        push(&mut sheet, 1, 3, "b");
        push(&mut sheet, 3, 1, "c");
        push(&mut sheet, 3, 3, "d");

        assert_eq!(sheet.row_lower_bound, Some(1));
        assert_eq!(sheet.row_upper_bound, Some(3));
        assert_eq!(sheet.col_lower_bound, Some(1));
        assert_eq!(sheet.col_upper_bound, Some(3));
    }

    #[test]
    fn sheet_into_table_keeps_interior_blank_rows() {
        let mut sheet = Sheet::new("report.xlsx", "Report");
        push(&mut sheet, 1, 1, "Impressions");
        push(&mut sheet, 1, 3, "Net Revenue");
        push(&mut sheet, 2, 1, "10");
        push(&mut sheet, 4, 3, "7");

        let table = sheet.into_table(&[]).unwrap();
        assert_eq!(table.row_count, 3);
        let names: Vec<&str> = table.columns.iter().map(|column| column.name.as_str()).collect();
        assert_eq!(names, ["Impressions", "Unnamed: 1", "Net Revenue"]);
        assert_eq!(table.columns[0].values[0], Value::Text("10".to_owned()));
        assert!(table.columns[0].values[1].is_empty());
        assert_eq!(table.columns[2].values[2], Value::Text("7".to_owned()));
    }
}
