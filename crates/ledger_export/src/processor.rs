//! Export orchestration.
//!
//! A [`Processor`] runs through `start`, then any of the `process_*` calls,
//! then `stop`. [`PgCopyProcessor`] is the binary COPY implementation: one
//! framed stream per table plus the options and errors JSON artifacts.

use ledger_ids::{EntryId, PostingId};
use ledger_model::{Document, Entry, EntryBody, Meta, OptionsMap, ValidationError};
use ledger_pgcopy::extract::{extract_base, extract_document, extract_entry, extract_posting};
use ledger_pgcopy::{write_header, write_trailer, EncodeError, EncoderSet, FieldValue, TableKind};
use ledger_sinks::SinkError;
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};
use thiserror::Error;
use tracing::{debug, info};

use crate::artifacts::{errors_json, normalize_errors, normalize_options, options_json};
use crate::paths::{PathError, PathNormalizer};

/// Filename of the options artifact.
pub const OPTIONS_FILENAME: &str = "option_maps.json";
/// Filename of the errors artifact.
pub const ERRORS_FILENAME: &str = "errors.json";

/// Output file for a table, e.g. `posting.bin`.
pub fn table_filename(kind: TableKind) -> String {
    format!("{}.bin", kind.name())
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Cannot {operation}: {reason}")]
    InvalidState {
        operation: &'static str,
        reason: &'static str,
    },
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("Failed to encode {table} row: {source}")]
    Encode {
        table: &'static str,
        #[source]
        source: EncodeError,
    },
    #[error("Failed to compile table encoders: {0}")]
    Schema(#[source] EncodeError),
    #[error("Failed to serialize {artifact}: {source}")]
    Json {
        artifact: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write {sink}: {source}")]
    Io {
        sink: &'static str,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Sink(#[from] SinkError),
}

pub type ExportResult<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    NotStarted,
    Started,
    Finished,
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessorState::NotStarted => "not started",
            ProcessorState::Started => "started",
            ProcessorState::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Row counts of a finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    rows: [u64; TableKind::COUNT],
    pub entries: u64,
    pub errors: usize,
    pub options_written: bool,
}

impl ExportSummary {
    pub fn rows(&self, kind: TableKind) -> u64 {
        self.rows[kind.index()]
    }

    pub fn total_rows(&self) -> u64 {
        self.rows.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TableKind, u64)> + '_ {
        TableKind::all().map(move |kind| (kind, self.rows(kind)))
    }
}

/// An exporter driven through the fixed lifecycle
/// `start → process_* → stop`.
pub trait Processor {
    fn start(&mut self) -> ExportResult<()>;

    /// At most once per export.
    fn process_options(&mut self, options: &OptionsMap) -> ExportResult<()>;

    /// At most once per export.
    fn process_errors(&mut self, errors: &[ValidationError]) -> ExportResult<()>;

    /// Entries are written in the order given.
    fn process_entries(&mut self, entries: &[Entry]) -> ExportResult<()>;

    fn stop(&mut self) -> ExportResult<ExportSummary>;
}

/// Every writer an export owns. Table sinks are indexed by
/// [`TableKind::index`]; the JSON artifacts are optional.
#[derive(Debug)]
pub struct ExportSinks<W> {
    tables: Vec<W>,
    options: Option<W>,
    errors: Option<W>,
}

impl<W> ExportSinks<W> {
    /// Open one sink per table, passing each its [`table_filename`].
    pub fn open_tables<E, F>(mut open: F) -> Result<Self, E>
    where
        F: FnMut(&str) -> Result<W, E>,
    {
        let tables = TableKind::all()
            .map(|kind| open(&table_filename(kind)))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Self {
            tables,
            options: None,
            errors: None,
        })
    }

    pub fn with_options(mut self, sink: W) -> Self {
        self.options = Some(sink);
        self
    }

    pub fn with_errors(mut self, sink: W) -> Self {
        self.errors = Some(sink);
        self
    }

    pub fn table(&self, kind: TableKind) -> &W {
        &self.tables[kind.index()]
    }

    fn table_mut(&mut self, kind: TableKind) -> &mut W {
        &mut self.tables[kind.index()]
    }

    pub fn options(&self) -> Option<&W> {
        self.options.as_ref()
    }

    pub fn errors(&self) -> Option<&W> {
        self.errors.as_ref()
    }

    /// All sinks: tables in [`TableKind::all`] order, then options and errors.
    pub fn into_vec(self) -> Vec<W> {
        let mut sinks = self.tables;
        sinks.extend(self.options);
        sinks.extend(self.errors);
        sinks
    }
}

fn io_error(sink: &'static str) -> impl FnOnce(io::Error) -> ExportError {
    move |source| ExportError::Io { sink, source }
}

/// Binary COPY exporter.
pub struct PgCopyProcessor<W: Write> {
    paths: PathNormalizer,
    encoders: EncoderSet,
    sinks: ExportSinks<W>,
    state: ProcessorState,
    options_written: bool,
    errors_written: Option<usize>,
    rows: [u64; TableKind::COUNT],
    entries: u64,
}

impl<W: Write> PgCopyProcessor<W> {
    pub fn new(paths: PathNormalizer, sinks: ExportSinks<W>) -> ExportResult<Self> {
        let encoders = EncoderSet::compile().map_err(ExportError::Schema)?;
        Ok(Self {
            paths,
            encoders,
            sinks,
            state: ProcessorState::NotStarted,
            options_written: false,
            errors_written: None,
            rows: [0; TableKind::COUNT],
            entries: 0,
        })
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn sinks(&self) -> &ExportSinks<W> {
        &self.sinks
    }

    /// Give the sinks back, e.g. to commit them.
    pub fn into_sinks(self) -> ExportSinks<W> {
        self.sinks
    }

    fn require_started(&self, operation: &'static str) -> ExportResult<()> {
        match self.state {
            ProcessorState::Started => Ok(()),
            ProcessorState::NotStarted => Err(ExportError::InvalidState {
                operation,
                reason: "processor not started",
            }),
            ProcessorState::Finished => Err(ExportError::InvalidState {
                operation,
                reason: "processor already stopped",
            }),
        }
    }

    fn write_row(
        &mut self,
        kind: TableKind,
        values: Result<Vec<FieldValue>, EncodeError>,
    ) -> ExportResult<()> {
        let table = kind.name();
        let row = values
            .and_then(|values| self.encoders.get(kind).encode_row(&values))
            .map_err(|source| ExportError::Encode { table, source })?;
        self.sinks
            .table_mut(kind)
            .write_all(&row)
            .map_err(io_error(table))?;
        self.rows[kind.index()] += 1;
        Ok(())
    }

    /// Base row, type row, then one row per posting.
    fn export_entry(&mut self, entry: &Entry) -> ExportResult<()> {
        let id = EntryId::new();
        let kind = entry.kind();
        let meta = self.paths.strip_meta(&entry.meta)?;

        self.write_row(
            TableKind::EntryBase,
            extract_base(id, kind, entry.date, &meta),
        )?;

        let values = match &entry.body {
            EntryBody::Document(document) => {
                let filename = self.paths.strip(&document.filename)?;
                Ok(extract_document(id, &Document { filename, ..document.clone() }))
            }
            body => extract_entry(id, body),
        };
        self.write_row(TableKind::Entry(kind), values)?;

        if let EntryBody::Transaction(txn) = &entry.body {
            let empty = Meta::new();
            for posting in &txn.postings {
                let meta = match &posting.meta {
                    Some(meta) => self.paths.strip_meta(meta)?,
                    None => Cow::Borrowed(&empty),
                };
                let values = extract_posting(PostingId::new(), id, posting, &meta);
                self.write_row(TableKind::Posting, values)?;
            }
        }

        self.entries += 1;
        Ok(())
    }
}

impl<W: Write> Processor for PgCopyProcessor<W> {
    fn start(&mut self) -> ExportResult<()> {
        if self.state != ProcessorState::NotStarted {
            return Err(ExportError::InvalidState {
                operation: "start",
                reason: "processor already started",
            });
        }
        for kind in TableKind::all() {
            write_header(self.sinks.table_mut(kind)).map_err(io_error(kind.name()))?;
        }
        self.state = ProcessorState::Started;
        debug!("Wrote COPY headers for {} tables", TableKind::COUNT);
        Ok(())
    }

    fn process_options(&mut self, options: &OptionsMap) -> ExportResult<()> {
        self.require_started("process options")?;
        if self.options_written {
            return Err(ExportError::InvalidState {
                operation: "process options",
                reason: "options already written",
            });
        }
        let normalized = normalize_options(options, &self.paths)?;
        let json = options_json(&normalized).map_err(|source| ExportError::Json {
            artifact: OPTIONS_FILENAME,
            source,
        })?;
        let sink = self.sinks.options.as_mut().ok_or(ExportError::InvalidState {
            operation: "process options",
            reason: "no options sink configured",
        })?;
        sink.write_all(&json).map_err(io_error(OPTIONS_FILENAME))?;
        self.options_written = true;
        debug!("Wrote {} options", normalized.len());
        Ok(())
    }

    fn process_errors(&mut self, errors: &[ValidationError]) -> ExportResult<()> {
        self.require_started("process errors")?;
        if self.errors_written.is_some() {
            return Err(ExportError::InvalidState {
                operation: "process errors",
                reason: "errors already written",
            });
        }
        let normalized = normalize_errors(errors, &self.paths)?;
        let json = errors_json(&normalized).map_err(|source| ExportError::Json {
            artifact: ERRORS_FILENAME,
            source,
        })?;
        let sink = self.sinks.errors.as_mut().ok_or(ExportError::InvalidState {
            operation: "process errors",
            reason: "no errors sink configured",
        })?;
        sink.write_all(&json).map_err(io_error(ERRORS_FILENAME))?;
        self.errors_written = Some(normalized.len());
        debug!("Wrote {} validation errors", normalized.len());
        Ok(())
    }

    fn process_entries(&mut self, entries: &[Entry]) -> ExportResult<()> {
        self.require_started("process entries")?;
        for entry in entries {
            self.export_entry(entry)?;
        }
        debug!("Exported {} entries", entries.len());
        Ok(())
    }

    fn stop(&mut self) -> ExportResult<ExportSummary> {
        self.require_started("stop")?;
        for kind in TableKind::all() {
            let sink = self.sinks.table_mut(kind);
            write_trailer(sink).map_err(io_error(kind.name()))?;
            sink.flush().map_err(io_error(kind.name()))?;
        }
        if let Some(sink) = self.sinks.options.as_mut() {
            sink.flush().map_err(io_error(OPTIONS_FILENAME))?;
        }
        if let Some(sink) = self.sinks.errors.as_mut() {
            sink.flush().map_err(io_error(ERRORS_FILENAME))?;
        }
        self.state = ProcessorState::Finished;

        let summary = ExportSummary {
            rows: self.rows,
            entries: self.entries,
            errors: self.errors_written.unwrap_or(0),
            options_written: self.options_written,
        };
        for (kind, rows) in summary.iter() {
            debug!("Table {}: {} rows", kind, rows);
        }
        info!(
            "Export finished: {} entries, {} postings, {} rows total",
            summary.entries,
            summary.rows(TableKind::Posting),
            summary.total_rows()
        );
        Ok(summary)
    }
}
