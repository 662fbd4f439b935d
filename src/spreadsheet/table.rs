use std::fmt::Display;

/// A single value read from a source table.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Blank cell or null literal
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Number(number) => write!(f, "{number}"),
            Value::Text(text) => f.write_str(text),
            Value::Bool(boolean) => write!(f, "{boolean}"),
        }
    }
}

/// One named column of a loaded table.
#[derive(Clone, Debug, PartialEq)]
pub struct TableColumn {
    /// Header text exactly as found in the source
    pub name: String,
    pub values: Vec<Value>,
}

/// A source report parsed into named columns of equal length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadedTable {
    /// Columns in source order; names are unique
    pub columns: Vec<TableColumn>,
    pub row_count: usize,
}

impl LoadedTable {
    /// Builds a table from header names and row-major records.
    ///
    /// Blank header names become `Unnamed: <position>` and repeated names get a `.1`, `.2`, ...
    /// suffix so every column can be addressed by name. Short records are padded with
    /// [`Value::Empty`]; cells beyond the header width are dropped.
    pub fn from_rows(header: Vec<String>, rows: Vec<Vec<Value>>) -> LoadedTable {
        let names = unique_names(header);
        let row_count = rows.len();
        let mut columns: Vec<TableColumn> = names
            .into_iter()
            .map(|name| TableColumn {
                name,
                values: Vec::with_capacity(row_count),
            })
            .collect();
        for row in rows {
            let mut values = row.into_iter();
            for column in columns.iter_mut() {
                column.values.push(values.next().unwrap_or_default());
            }
        }
        LoadedTable { columns, row_count }
    }

    /// Looks up a column by its exact name.
    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Looks up a column ignoring surrounding whitespace and letter case on both sides.
    /// The first column in source order wins.
    pub fn find_column(&self, name: &str) -> Option<&TableColumn> {
        let wanted = normalize_name(name);
        self.columns
            .iter()
            .find(|column| normalize_name(&column.name) == wanted)
    }
}

/// Normal form used when matching requested metric names against headers.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn unique_names(header: Vec<String>) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for (position, name) in header.into_iter().enumerate() {
        let name = if name.is_empty() {
            format!("Unnamed: {position}")
        } else {
            name
        };
        let mut candidate = name.clone();
        let mut suffix = 0usize;
        while names.contains(&candidate) {
            suffix += 1;
            candidate = format!("{name}.{suffix}");
        }
        names.push(candidate);
    }
    names
}
