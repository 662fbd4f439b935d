//! # Rusty Summary
//!
//! Builds one spreadsheet out of a bundle of advertising revenue reports. Every source (AdX,
//! Magnite, Xandr, ...) exports its own CSV or xlsx layout; a [`SourceCatalog`] says which file of
//! the ZIP bundle belongs to which source, which worksheet to read and which metric columns to
//! pull. The pulled columns are laid side by side under a three-row header
//! (source, metric, breakdown) and written as `Full_Report.xlsx`.
//!
//! ## Features
//!
//! - **Data-driven catalog**: the eight built-in sources, or any catalog loaded from TOML
//! - **Forgiving column matching**: metric names match headers regardless of case and surrounding
//!   whitespace
//! - **Breakdowns**: a metric can be split by the values of a discriminator column
//! - **Pure Rust readers**: streaming xlsx parsing and delimited text with delimiter detection
//! - **Isolated failures**: a missing or broken source is reported and skipped
//!
//! ## Example
//!
//! ```no_run
//! use rusty_summary::{pipeline, Archive, SourceCatalog};
//!
//! let archive = Archive::open("reports.zip")?;
//! let outcome = pipeline::run(&SourceCatalog::builtin(), &archive)?;
//! if let Some(bytes) = outcome.bytes() {
//!     std::fs::write(rusty_summary::REPORT_FILE_NAME, bytes)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod archive;
pub mod assemble;
pub mod catalog;
pub mod error;
pub mod extract;
mod helpers;
pub mod pipeline;
pub mod render;
pub mod spreadsheet;

pub use archive::Archive;
pub use archive::ArchiveEntry;
pub use catalog::SourceCatalog;
pub use catalog::SourceDefinition;
pub use error::RustySummaryError;
pub use pipeline::Notice;
pub use pipeline::Outcome;

/// File name the summary workbook is delivered under
pub const REPORT_FILE_NAME: &str = "Full_Report.xlsx";

/// Media type of the summary workbook
pub const REPORT_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
