//! `ledger-export`: write a loaded ledger as PostgreSQL binary COPY files.
//!
//! Exit status: 0 on success, 1 when the loader reported validation errors,
//! 2 when the export itself failed.

use anyhow::{bail, Context, Result};
use clap::Parser;
use ledger_export::{export_ledger, ExportConfig};
use ledger_logging::{init_logging, LogConfig};
use ledger_model::LoadedLedger;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

const EXIT_VALIDATION_ERRORS: u8 = 1;
const EXIT_EXPORT_FAILED: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "ledger-export",
    version,
    about = "Export a loaded ledger as PostgreSQL binary COPY files"
)]
struct Cli {
    /// Loader hand-off document (JSON with options, errors and entries)
    filename: PathBuf,

    /// Base path stripped from file paths in the output [default: current directory]
    #[arg(long, env = "BASE_PATH")]
    base_path: Option<PathBuf>,

    /// Directory for the output files [default: current directory]
    #[arg(long, env = "OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Keep file paths as they appear in the input
    #[arg(long)]
    disable_path_stripping: bool,

    /// Do not write the options artifact
    #[arg(long)]
    disable_options: bool,

    /// Do not write the validation errors artifact
    #[arg(long)]
    disable_validations: bool,

    /// Do not write entry rows (table files still get header and trailer)
    #[arg(long)]
    disable_entries: bool,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Log as JSON lines on stderr
    #[arg(long)]
    log_json: bool,
}

fn absolute(cwd: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

impl Cli {
    fn export_config(&self) -> Result<ExportConfig> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        let base_path = absolute(&cwd, self.base_path.clone().unwrap_or_else(|| cwd.clone()));
        if !base_path.is_dir() {
            bail!("Base path is not a directory: {}", base_path.display());
        }
        let output_dir = absolute(&cwd, self.output_dir.clone().unwrap_or_else(|| cwd.clone()));

        Ok(ExportConfig {
            base_path,
            output_dir,
            strip_paths: !self.disable_path_stripping,
            include_options: !self.disable_options,
            include_errors: !self.disable_validations,
            include_entries: !self.disable_entries,
        })
    }
}

/// Returns whether the loader reported validation errors.
fn run(cli: &Cli) -> Result<bool> {
    let config = cli.export_config()?;

    let bytes = std::fs::read(&cli.filename)
        .with_context(|| format!("Failed to read {}", cli.filename.display()))?;
    let ledger = LoadedLedger::from_json_slice(&bytes)
        .with_context(|| format!("Failed to parse ledger document {}", cli.filename.display()))?;

    if ledger.has_errors() {
        warn!("Loader reported {} validation errors", ledger.errors.len());
    }

    let report = export_ledger(&config, &ledger).context("Export failed")?;
    info!(
        "Wrote {} files to {}",
        report.files.len(),
        config.output_dir.display()
    );

    Ok(ledger.has_errors())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(LogConfig {
        app_name: "ledger-export",
        verbose: cli.verbose,
        json: cli.log_json,
    }) {
        eprintln!("Warning: {:#}", err);
    }

    match run(&cli) {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(EXIT_VALIDATION_ERRORS),
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {:?}", err);
            ExitCode::from(EXIT_EXPORT_FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_map_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_str().unwrap();
        let cli = Cli::parse_from([
            "ledger-export",
            "ledger.json",
            "--base-path",
            base,
            "--output-dir",
            "/tmp/out",
            "--disable-options",
            "--disable-entries",
        ]);
        let config = cli.export_config().unwrap();
        assert_eq!(config.base_path, dir.path());
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(config.strip_paths);
        assert!(!config.include_options);
        assert!(config.include_errors);
        assert!(!config.include_entries);
    }

    #[test]
    fn test_missing_base_path_rejected() {
        let cli = Cli::parse_from([
            "ledger-export",
            "ledger.json",
            "--base-path",
            "/definitely/not/here",
        ]);
        assert!(cli.export_config().is_err());
    }
}
