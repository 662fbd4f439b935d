//! # Pipeline
//!
//! Runs the catalog against an archive: find each source's entry, load it, extract its metrics,
//! assemble the summary and render it. A source that is absent or unreadable is skipped with a
//! [`Notice`]; only a render failure stops the run.
use crate::archive::Archive;
use crate::assemble::assemble;
use crate::assemble::SourceExtraction;
use crate::catalog::SourceCatalog;
use crate::catalog::SourceDefinition;
use crate::extract::extract;
use crate::render::render;
use crate::render::RenderError;
use crate::spreadsheet;
use std::fmt::Display;
use tracing::error;
use tracing::info;
use tracing::warn;

/// Messages for whoever drives the run, in the order they occurred
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The archive was read
    ArchiveOpened { entries: usize },
    /// No entry name contains the pattern
    PatternNotFound { pattern: String },
    /// The matched entry could not be parsed
    LoadFailed { entry: String, message: String },
    /// Not a single source contributed to the summary
    NoMatchingFiles,
}

impl Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::ArchiveOpened { entries } => write!(f, "{entries} files found in the archive"),
            Notice::PatternNotFound { pattern } => write!(f, "No file found for pattern: {pattern}"),
            Notice::LoadFailed { entry, message } => write!(f, "Error reading {entry}: {message}"),
            Notice::NoMatchingFiles => f.write_str("No matching files found in the archive"),
        }
    }
}

impl Notice {
    /// Returns true for notices that flag a problem
    pub fn is_warning(&self) -> bool {
        !matches!(self, Notice::ArchiveOpened { .. })
    }

    fn log(&self) {
        match self {
            Notice::ArchiveOpened { .. } => info!("{}", self),
            Notice::PatternNotFound { .. } | Notice::NoMatchingFiles => warn!("{}", self),
            Notice::LoadFailed { .. } => error!("{}", self),
        }
    }
}

/// Result of a run
#[derive(Clone, Debug, PartialEq)]
pub enum Report {
    /// Bytes of the summary workbook
    Rendered(Vec<u8>),
    /// Nothing matched; no workbook was produced
    NoMatches,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub notices: Vec<Notice>,
    pub report: Report,
}

impl Outcome {
    /// Workbook bytes, if one was produced
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.report {
            Report::Rendered(bytes) => Some(bytes),
            Report::NoMatches => None,
        }
    }
}

#[derive(Default)]
struct Notices {
    items: Vec<Notice>,
}

impl Notices {
    fn push(&mut self, notice: Notice) {
        notice.log();
        self.items.push(notice);
    }
}

/// Builds the summary of every catalog source found in `archive`.
pub fn run(catalog: &SourceCatalog, archive: &Archive) -> Result<Outcome, RenderError> {
    let mut notices = Notices::default();
    notices.push(Notice::ArchiveOpened { entries: archive.len() });

    let extractions: Vec<SourceExtraction> = catalog
        .sources()
        .iter()
        .map(|definition| process_source(definition, archive, &mut notices))
        .collect();

    let report = match assemble(extractions) {
        Ok(table) => Report::Rendered(render(&table)?),
        Err(_) => {
            notices.push(Notice::NoMatchingFiles);
            Report::NoMatches
        }
    };
    Ok(Outcome {
        notices: notices.items,
        report,
    })
}

fn process_source(definition: &SourceDefinition, archive: &Archive, notices: &mut Notices) -> SourceExtraction {
    let entry = match archive.find(&definition.match_pattern) {
        Some(Ok(entry)) => entry,
        Some(Err(unreadable)) => {
            notices.push(Notice::LoadFailed {
                entry: unreadable.name.to_owned(),
                message: unreadable.message.to_owned(),
            });
            return SourceExtraction::not_found();
        }
        None => {
            notices.push(Notice::PatternNotFound {
                pattern: definition.match_pattern.to_owned(),
            });
            return SourceExtraction::not_found();
        }
    };
    match spreadsheet::load(entry, definition.sheet_selector.as_deref()) {
        Ok(table) => {
            info!(pattern = %definition.match_pattern, entry = %entry.name, rows = table.row_count, "Matched source");
            let columns = extract(&table, definition, &entry.name);
            SourceExtraction::found(&entry.name, columns)
        }
        Err(load_error) => {
            notices.push(Notice::LoadFailed {
                entry: load_error.entry,
                message: load_error.source.to_string(),
            });
            SourceExtraction::not_found()
        }
    }
}
