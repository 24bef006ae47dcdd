//! Ledger export to PostgreSQL binary COPY files.
//!
//! [`export_ledger`] is the whole pipeline: open staged sinks in the output
//! directory, run a [`PgCopyProcessor`] over the loaded ledger, and commit
//! every file together. A failure anywhere leaves no output files behind.

pub mod artifacts;
pub mod config;
pub mod paths;
pub mod processor;

pub use config::ExportConfig;
pub use paths::{PathError, PathNormalizer};
pub use processor::{
    table_filename, ExportError, ExportResult, ExportSinks, ExportSummary, PgCopyProcessor,
    Processor, ProcessorState, ERRORS_FILENAME, OPTIONS_FILENAME,
};

use ledger_model::LoadedLedger;
use ledger_sinks::{OutputDir, SinkRegistry};
use std::path::PathBuf;
use tracing::info;

/// Result of a committed export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub summary: ExportSummary,
    /// Final paths of every committed file
    pub files: Vec<PathBuf>,
}

/// Export `ledger` into `config.output_dir`.
pub fn export_ledger(config: &ExportConfig, ledger: &LoadedLedger) -> ExportResult<ExportReport> {
    let output = OutputDir::create(&config.output_dir)?;

    let mut sinks = ExportSinks::open_tables(|name| output.open(name))?;
    if config.include_options {
        sinks = sinks.with_options(output.open(OPTIONS_FILENAME)?);
    }
    if config.include_errors {
        sinks = sinks.with_errors(output.open(ERRORS_FILENAME)?);
    }

    info!(
        "Exporting {} entries to {}",
        ledger.entries.len(),
        output.path().display()
    );

    let mut processor = PgCopyProcessor::new(config.path_normalizer(), sinks)?;
    processor.start()?;
    if config.include_options {
        processor.process_options(&ledger.options)?;
    }
    if config.include_errors {
        processor.process_errors(&ledger.errors)?;
    }
    if config.include_entries {
        processor.process_entries(&ledger.entries)?;
    }
    let summary = processor.stop()?;

    let registry: SinkRegistry = processor.into_sinks().into_vec().into_iter().collect();
    let files = registry.finish()?;

    Ok(ExportReport { summary, files })
}
