//! # Metric Extractor
//!
//! Pulls the requested metric columns out of a loaded table. Column names are matched after
//! trimming and lowercasing both sides. When the source has a breakdown rule and the table
//! carries its discriminator column, every metric is split into one column per breakdown value;
//! otherwise each metric yields a single whole-table column with an empty breakdown.
use crate::catalog::BreakdownRule;
use crate::catalog::SourceDefinition;
use crate::spreadsheet::LoadedTable;
use crate::spreadsheet::TableColumn;
use crate::spreadsheet::Value;
use std::collections::HashMap;
use tracing::debug;

/// Three-level header of one output column
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    /// Name of the archive entry the column came from
    pub source_label: String,
    pub metric: String,
    /// Breakdown value, empty for sources without a breakdown split
    pub breakdown: String,
}

impl ColumnKey {
    pub fn new(source_label: &str, metric: &str, breakdown: &str) -> Self {
        Self {
            source_label: source_label.to_owned(),
            metric: metric.to_owned(),
            breakdown: breakdown.to_owned(),
        }
    }
}

/// One cell of an extracted column
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Slot {
    /// A value copied from the source table
    Value(Value),
    /// The source has no data for this cell: metric column or breakdown partition absent
    Missing,
    /// Padding added to align a column with longer ones
    #[default]
    Blank,
}

impl Slot {
    /// Returns true for slots that render as an empty cell
    pub fn is_empty(&self) -> bool {
        match self {
            Slot::Value(value) => value.is_empty(),
            Slot::Missing | Slot::Blank => true,
        }
    }
}

/// Extracted columns keyed by [`ColumnKey`], in insertion order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnSet {
    columns: Vec<(ColumnKey, Vec<Slot>)>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column; a key seen before keeps its position and takes the new values.
    pub fn insert(&mut self, key: ColumnKey, slots: Vec<Slot>) {
        match self.columns.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, values)) => *values = slots,
            None => self.columns.push((key, slots)),
        }
    }

    pub fn get(&self, key: &ColumnKey) -> Option<&[Slot]> {
        self.columns
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, slots)| slots.as_slice())
    }

    /// Length of the longest column, zero when there are none
    pub fn extent(&self) -> usize {
        self.columns.iter().map(|(_, slots)| slots.len()).max().unwrap_or(0)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ColumnKey> {
        self.columns.iter().map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ColumnKey, &[Slot])> {
        self.columns.iter().map(|(key, slots)| (key, slots.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl IntoIterator for ColumnSet {
    type Item = (ColumnKey, Vec<Slot>);
    type IntoIter = std::vec::IntoIter<(ColumnKey, Vec<Slot>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

/// Extracts the metric columns `definition` asks for, labelled with `source_label`.
pub fn extract(table: &LoadedTable, definition: &SourceDefinition, source_label: &str) -> ColumnSet {
    let discriminator = definition
        .breakdown_rule
        .as_ref()
        .and_then(|rule| table.column(&rule.discriminator_column).map(|column| (rule, column)));
    let columns = match discriminator {
        Some((rule, column)) => extract_breakdown(table, definition, rule, column, source_label),
        None => extract_whole(table, definition, source_label),
    };
    debug!(source = source_label, columns = columns.len(), rows = columns.extent(), "Extracted metrics");
    columns
}

fn extract_whole(table: &LoadedTable, definition: &SourceDefinition, source_label: &str) -> ColumnSet {
    let mut columns = ColumnSet::new();
    for metric in &definition.metrics {
        let slots = match table.find_column(metric) {
            Some(column) => column.values.iter().cloned().map(Slot::Value).collect(),
            None => vec![Slot::Missing; table.row_count],
        };
        columns.insert(ColumnKey::new(source_label, metric, ""), slots);
    }
    columns
}

fn extract_breakdown(
    table: &LoadedTable,
    definition: &SourceDefinition,
    rule: &BreakdownRule,
    discriminator: &TableColumn,
    source_label: &str,
) -> ColumnSet {
    // Row positions of every partition, rows with an empty discriminator belong to none
    let mut partitions: HashMap<String, Vec<usize>> = HashMap::new();
    for (row, value) in discriminator.values.iter().enumerate() {
        if !value.is_empty() {
            partitions.entry(value.to_string()).or_default().push(row);
        }
    }

    let mut columns = ColumnSet::new();
    for metric in &definition.metrics {
        let metric_column = table.find_column(metric);
        for breakdown in &rule.breakdown_values {
            let slots = match (partitions.get(breakdown), metric_column) {
                (None, _) => vec![Slot::Missing; table.row_count],
                (Some(rows), None) => vec![Slot::Missing; rows.len()],
                (Some(rows), Some(column)) => rows
                    .iter()
                    .map(|row| Slot::Value(column.values[*row].clone()))
                    .collect(),
            };
            columns.insert(ColumnKey::new(source_label, metric, breakdown), slots);
        }
    }
    columns
}
