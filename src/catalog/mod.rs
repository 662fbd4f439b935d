//! # Source Catalog
//!
//! The ordered list of report sources a bundle is expected to contain. Each definition names the
//! substring that identifies its file, the worksheet to read, the metric columns to pull and an
//! optional breakdown rule splitting those metrics by the values of a discriminator column.
//!
//! The order of definitions is the order of the summary's column groups.
use crate::error::ResultMessage;
use crate::error::RustySummaryError;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Errors raised when a catalog document describes an unusable source
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Source #{0} has an empty pattern")]
    EmptyPattern(usize),

    #[error("Source '{0}' lists no metrics")]
    EmptyMetrics(String),

    #[error("Breakdown of source '{0}' lists no values")]
    EmptyBreakdown(String),
}

/// Splits each metric into one column per discriminator value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownRule {
    /// Column whose value decides the partition a row belongs to
    #[serde(rename = "column")]
    pub discriminator_column: String,
    /// Partitions to emit, in output order
    #[serde(rename = "values")]
    pub breakdown_values: Vec<String>,
}

/// One expected source report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// Case-sensitive substring of the archive entry name
    #[serde(rename = "pattern")]
    pub match_pattern: String,
    /// Worksheet to read; the first worksheet when absent
    #[serde(rename = "sheet", default, skip_serializing_if = "Option::is_none")]
    pub sheet_selector: Option<String>,
    pub metrics: Vec<String>,
    #[serde(rename = "breakdown", default, skip_serializing_if = "Option::is_none")]
    pub breakdown_rule: Option<BreakdownRule>,
}

impl SourceDefinition {
    fn new(pattern: &str, sheet: Option<&str>, metrics: [&str; 2]) -> Self {
        Self {
            match_pattern: pattern.to_owned(),
            sheet_selector: sheet.map(str::to_owned),
            metrics: metrics.iter().map(|metric| metric.to_string()).collect(),
            breakdown_rule: None,
        }
    }

    fn with_breakdown(mut self, column: &str, values: &[&str]) -> Self {
        self.breakdown_rule = Some(BreakdownRule {
            discriminator_column: column.to_owned(),
            breakdown_values: values.iter().map(|value| value.to_string()).collect(),
        });
        self
    }
}

/// TOML shape of a catalog: a list of `[[source]]` tables
#[derive(Serialize, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    source: Vec<SourceDefinition>,
}

/// Ordered, immutable set of source definitions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceCatalog {
    sources: Vec<SourceDefinition>,
}

impl SourceCatalog {
    /// Builds a catalog after checking every definition is usable
    pub fn new(sources: Vec<SourceDefinition>) -> Result<Self, CatalogError> {
        for (index, source) in sources.iter().enumerate() {
            if source.match_pattern.is_empty() {
                return Err(CatalogError::EmptyPattern(index));
            }
            if source.metrics.is_empty() {
                return Err(CatalogError::EmptyMetrics(source.match_pattern.to_owned()));
            }
            if let Some(rule) = &source.breakdown_rule {
                if rule.breakdown_values.is_empty() {
                    return Err(CatalogError::EmptyBreakdown(source.match_pattern.to_owned()));
                }
            }
        }
        Ok(Self { sources })
    }

    /// The eight ad-revenue sources the summary is built from
    pub fn builtin() -> Self {
        let sources = vec![
            SourceDefinition::new("Daily-AdX", Some("Report data"), ["Ad Exchange impressions", "Ad Exchange revenue ($)"])
                .with_breakdown("Programmatic channel", &["Open Auction", "Private Auction"]),
            SourceDefinition::new("Daily-Preferred Deals", Some("Report data"), ["Total impressions", "Total CPM and CPC revenue ($)"]),
            SourceDefinition::new("Magnite", Some("Report"), ["Paid Impressions", "Publisher Net Revenue"]),
            SourceDefinition::new("Net_Revenue_Report_for", Some("Ad Requests, Ads Sent by Date"), ["Impressions", "Net Revenue"]),
            SourceDefinition::new("Xandr_Daily_updated", Some("Report Data"), ["imps", "revenue"]),
            SourceDefinition::new("Citrus Ads Daily Report", None, ["Ad Renders", "Publisher Revenue"]),
            SourceDefinition::new("Sharethrough", None, ["Rendered Impressions", "Earnings"]),
            SourceDefinition::new("Daily-Open Bidding", Some("Report data"), ["Yield group impressions", "Yield group estimated revenue ($)"]),
        ];
        Self { sources }
    }

    /// Parses a TOML catalog document
    pub fn from_toml_str(document: &str) -> Result<Self, RustySummaryError> {
        let document: CatalogDocument = toml::from_str(document)?;
        Ok(Self::new(document.source)?)
    }

    /// Reads and parses a TOML catalog file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RustySummaryError> {
        let path = path.as_ref();
        let prefix = format!("Load catalog '{}' failed", path.display());
        let document = std::fs::read_to_string(path)
            .map_err(RustySummaryError::from)
            .with_prefix(&prefix)?;
        Self::from_toml_str(&document).with_prefix(&prefix)
    }

    /// Serializes the catalog back to a TOML document
    pub fn to_toml_string(&self) -> Result<String, RustySummaryError> {
        let document = CatalogDocument {
            source: self.sources.to_vec(),
        };
        Ok(toml::to_string(&document)?)
    }

    pub fn sources(&self) -> &[SourceDefinition] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for SourceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
