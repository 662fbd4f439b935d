//! Command-line front end: reads a ZIP bundle of source reports and writes the summary workbook.
//!
//! **Usage:**
//! ```bash
//! rusty_summary reports.zip [--output Full_Report.xlsx] [--catalog sources.toml]
//! rusty_summary --print-catalog
//! ```

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use rusty_summary::pipeline;
use rusty_summary::Archive;
use rusty_summary::SourceCatalog;
use rusty_summary::REPORT_FILE_NAME;
use std::path::PathBuf;
use tracing::info;
use tracing::warn;

/// Merge ad revenue reports into one multi-header summary workbook
#[derive(Parser, Debug)]
#[clap(name = "rusty_summary", version)]
struct Args {
    /// ZIP archive holding the source reports
    #[clap(value_name = "ARCHIVE", required_unless_present = "print_catalog")]
    archive: Option<PathBuf>,

    /// Where to write the summary workbook
    #[clap(short, long, value_name = "FILE", default_value = REPORT_FILE_NAME)]
    output: PathBuf,

    /// TOML catalog replacing the built-in source list
    #[clap(short, long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Print the effective catalog as TOML and exit
    #[clap(long)]
    print_catalog: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let catalog = match &args.catalog {
        Some(path) => SourceCatalog::load(path)?,
        None => SourceCatalog::builtin(),
    };
    if args.print_catalog {
        print!("{}", catalog.to_toml_string()?);
        return Ok(());
    }

    let Some(archive_path) = args.archive else {
        anyhow::bail!("An archive path is required");
    };
    let archive = Archive::open(&archive_path)?;
    let outcome = pipeline::run(&catalog, &archive).context("Failed to render the summary workbook")?;

    match outcome.bytes() {
        Some(bytes) => {
            std::fs::write(&args.output, bytes)
                .with_context(|| format!("Failed to write {}", args.output.display()))?;
            info!("Summary written to {} ({} bytes)", args.output.display(), bytes.len());
        }
        None => warn!("Nothing to write"),
    }
    Ok(())
}
