//! # Header Assembler
//!
//! Joins the columns of every found source into one wide table, aligned by row position and
//! padded with blanks to the longest source.
use crate::extract::ColumnKey;
use crate::extract::ColumnSet;
use crate::extract::Slot;
use thiserror::Error;
use tracing::debug;

/// No source contributed any column
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No matching files found")]
pub struct EmptyResult;

/// What one catalog entry produced
#[derive(Clone, Debug, Default)]
pub struct SourceExtraction {
    /// Whether an archive entry matched and loaded
    pub found: bool,
    pub source_label: String,
    pub columns: ColumnSet,
}

impl SourceExtraction {
    pub fn found(source_label: &str, columns: ColumnSet) -> Self {
        Self {
            found: true,
            source_label: source_label.to_owned(),
            columns,
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }
}

/// The summary table: unique three-level keys over columns of equal length
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssembledTable {
    pub columns: Vec<(ColumnKey, Vec<Slot>)>,
    pub row_count: usize,
}

impl AssembledTable {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn get(&self, key: &ColumnKey) -> Option<&[Slot]> {
        self.columns
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, slots)| slots.as_slice())
    }
}

/// Merges the found extractions in order; unfound ones are ignored.
pub fn assemble<I>(extractions: I) -> Result<AssembledTable, EmptyResult>
where
    I: IntoIterator<Item = SourceExtraction>,
{
    let found: Vec<SourceExtraction> = extractions
        .into_iter()
        .filter(|extraction| extraction.found)
        .collect();
    let row_count = found
        .iter()
        .map(|extraction| extraction.columns.extent())
        .max()
        .unwrap_or(0);

    let mut merged = ColumnSet::new();
    for extraction in found {
        for (key, slots) in extraction.columns {
            merged.insert(key, slots);
        }
    }
    if merged.is_empty() {
        return Err(EmptyResult);
    }

    let columns: Vec<(ColumnKey, Vec<Slot>)> = merged
        .into_iter()
        .map(|(key, mut slots)| {
            slots.resize(row_count, Slot::Blank);
            (key, slots)
        })
        .collect();
    debug!(columns = columns.len(), rows = row_count, "Assembled summary");
    Ok(AssembledTable { columns, row_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::Value;

    fn numbers(label: &str, metric: &str, count: usize) -> (ColumnKey, Vec<Slot>) {
        let slots = (0..count).map(|row| Slot::Value(Value::Number(row as f64))).collect();
        (ColumnKey::new(label, metric, ""), slots)
    }

    fn source(label: &str, columns: Vec<(ColumnKey, Vec<Slot>)>) -> SourceExtraction {
        let mut set = ColumnSet::new();
        for (key, slots) in columns {
            set.insert(key, slots);
        }
        SourceExtraction::found(label, set)
    }

    #[test]
    fn shorter_sources_are_padded_with_blanks() {
        let table = assemble(vec![
            source("A.csv", vec![numbers("A.csv", "imps", 10)]),
            source("B.csv", vec![numbers("B.csv", "imps", 15)]),
        ]).unwrap();
        assert_eq!(table.row_count, 15);
        let a = table.get(&ColumnKey::new("A.csv", "imps", "")).unwrap();
        assert_eq!(a.len(), 15);
        assert_eq!(a[9], Slot::Value(Value::Number(9.0)));
        assert!(a[10..].iter().all(|slot| *slot == Slot::Blank));
    }

    #[test]
    fn unfound_sources_contribute_nothing() {
        let mut unfound = SourceExtraction::not_found();
        unfound.columns.insert(ColumnKey::new("Magnite.xlsx", "imps", ""), vec![Slot::Missing; 20]);
        let table = assemble(vec![unfound, source("B.csv", vec![numbers("B.csv", "imps", 3)])]).unwrap();
        assert_eq!(table.column_count(), 1);
        assert_eq!(table.row_count, 3);
        assert!(table.columns.iter().all(|(key, _)| key.source_label == "B.csv"));
    }

    #[test]
    fn columns_keep_source_then_metric_order() {
        let table = assemble(vec![
            source("A.csv", vec![numbers("A.csv", "imps", 1), numbers("A.csv", "revenue", 1)]),
            source("B.csv", vec![numbers("B.csv", "imps", 2)]),
        ]).unwrap();
        let keys: Vec<(&str, &str)> = table.columns.iter()
            .map(|(key, _)| (key.source_label.as_str(), key.metric.as_str()))
            .collect();
        assert_eq!(keys, [("A.csv", "imps"), ("A.csv", "revenue"), ("B.csv", "imps")]);
    }

    #[test]
    fn repeated_keys_across_sources_keep_first_position() {
        let table = assemble(vec![
            source("Daily-AdX.csv", vec![numbers("Daily-AdX.csv", "imps", 2)]),
            source("Other.csv", vec![numbers("Other.csv", "imps", 1)]),
            source("Daily-AdX.csv", vec![numbers("Daily-AdX.csv", "imps", 4)]),
        ]).unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.columns[0].0.source_label, "Daily-AdX.csv");
        assert_eq!(table.columns[0].1[3], Slot::Value(Value::Number(3.0)));
        assert_eq!(table.row_count, 4);
    }

    #[test]
    fn missing_markers_survive_padding() {
        let table = assemble(vec![
            source("A.csv", vec![(ColumnKey::new("A.csv", "revenue", ""), vec![Slot::Missing; 2])]),
            source("B.csv", vec![numbers("B.csv", "imps", 4)]),
        ]).unwrap();
        let a = table.get(&ColumnKey::new("A.csv", "revenue", "")).unwrap();
        assert_eq!(a, [Slot::Missing, Slot::Missing, Slot::Blank, Slot::Blank]);
    }

    #[test]
    fn nothing_found_is_an_empty_result() {
        assert_eq!(assemble(Vec::<SourceExtraction>::new()), Err(EmptyResult));
        assert_eq!(assemble(vec![SourceExtraction::not_found()]), Err(EmptyResult));
        assert_eq!(assemble(vec![source("A.csv", Vec::new())]), Err(EmptyResult));
    }

    #[test]
    fn zero_row_sources_still_have_headers() {
        let table = assemble(vec![source("A.csv", vec![numbers("A.csv", "imps", 0)])]).unwrap();
        assert_eq!(table.column_count(), 1);
        assert_eq!(table.row_count, 0);
    }
}
