//! Byte sinks for export artifacts.
//!
//! Every artifact is written to a hidden temp file next to its final path
//! and only renamed into place on commit. A [`SinkRegistry`] commits a whole
//! set of sinks together: if any rename fails, every sink of the set
//! (including those already committed) is rolled back. Uncommitted temp
//! files are removed when the sink is dropped.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors returned by sink creation and commit.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to create temp file {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to flush {}: {source}", path.display())]
    Flush {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to rename {} -> {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Sink '{name}' is already closed")]
    Closed { name: String },
}

pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// Hidden staging name for an artifact: `.{filename}.tmp`.
pub fn temp_filename(filename: &str) -> String {
    format!(".{}.tmp", filename)
}

/// A directory artifacts are committed into.
#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    /// Ensure the directory exists.
    pub fn create(path: impl Into<PathBuf>) -> SinkResult<Self> {
        let path = path.into();
        std::fs::create_dir_all(&path).map_err(|source| SinkError::CreateDir {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a staged sink that commits to `filename` inside this directory.
    pub fn open(&self, filename: &str) -> SinkResult<FileSink> {
        FileSink::create(&self.path, filename)
    }
}

/// A staged file sink.
///
/// Bytes go to `.{filename}.tmp` through a buffered writer. [`commit`]
/// flushes, syncs and renames it to `filename`.
///
/// [`commit`]: FileSink::commit
#[derive(Debug)]
pub struct FileSink {
    name: String,
    writer: Option<BufWriter<File>>,
    temp_path: Option<PathBuf>,
    final_path: PathBuf,
    bytes_written: u64,
    committed: bool,
}

impl FileSink {
    pub fn create(output_dir: &Path, filename: &str) -> SinkResult<Self> {
        let final_path = output_dir.join(filename);
        let temp_path = output_dir.join(temp_filename(filename));

        debug!(
            "Opening sink: {} (temp: {})",
            final_path.display(),
            temp_path.display()
        );

        let file = File::create(&temp_path).map_err(|source| SinkError::Create {
            path: temp_path.clone(),
            source,
        })?;

        Ok(Self {
            name: filename.to_string(),
            writer: Some(BufWriter::new(file)),
            temp_path: Some(temp_path),
            final_path,
            bytes_written: 0,
            committed: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    pub fn temp_path(&self) -> Option<&Path> {
        self.temp_path.as_deref()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Flush buffered bytes and sync the temp file to disk.
    fn prepare(&mut self) -> SinkResult<()> {
        let Some(mut writer) = self.writer.take() else {
            return Err(SinkError::Closed {
                name: self.name.clone(),
            });
        };
        let path = self.temp_path.clone().unwrap_or_else(|| self.final_path.clone());
        writer
            .flush()
            .map_err(|source| SinkError::Flush {
                path: path.clone(),
                source,
            })?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|source| SinkError::Flush { path, source })?;
        Ok(())
    }

    /// Promote the temp file to its final path.
    pub fn commit(&mut self) -> SinkResult<()> {
        self.prepare()?;
        if let Some(temp_path) = &self.temp_path {
            std::fs::rename(temp_path, &self.final_path).map_err(|source| SinkError::Rename {
                from: temp_path.clone(),
                to: self.final_path.clone(),
                source,
            })?;
            debug!(
                "Committed sink: {} ({} bytes)",
                self.final_path.display(),
                self.bytes_written
            );
            self.committed = true;
        }
        self.temp_path = None;
        Ok(())
    }

    /// Discard whatever this sink produced, committed or not.
    pub fn rollback(&mut self) {
        self.writer = None;
        if self.committed && self.final_path.exists() {
            let _ = std::fs::remove_file(&self.final_path);
            warn!("Rolled back committed file: {}", self.final_path.display());
        }
        if let Some(temp_path) = self.temp_path.take() {
            if temp_path.exists() {
                let _ = std::fs::remove_file(&temp_path);
                warn!("Rolled back temp file: {}", temp_path.display());
            }
        }
        self.committed = false;
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("sink '{}' is closed", self.name),
            )
        })?;
        let written = writer.write(buf)?;
        self.bytes_written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // Release the handle before unlinking.
        self.writer = None;
        if let Some(temp_path) = &self.temp_path {
            if temp_path.exists() {
                let _ = std::fs::remove_file(temp_path);
                warn!("Cleaned up orphaned temp file: {}", temp_path.display());
            }
        }
    }
}

/// Sinks committed or rolled back together.
#[derive(Debug, Default)]
pub struct SinkRegistry {
    sinks: Vec<FileSink>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: FileSink) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(FileSink::name).collect()
    }

    /// Commit every sink in registration order and return the final paths.
    ///
    /// On the first failure all sinks are rolled back and the error returned.
    pub fn finish(mut self) -> SinkResult<Vec<PathBuf>> {
        let commit_result: SinkResult<()> = self.sinks.iter_mut().try_for_each(FileSink::commit);

        if let Err(err) = commit_result {
            warn!("Sink commit failed, rolling back: {}", err);
            self.rollback();
            return Err(err);
        }

        info!("Committed {} output files", self.sinks.len());
        Ok(self
            .sinks
            .iter()
            .map(|sink| sink.final_path().to_path_buf())
            .collect())
    }

    /// Roll back every sink.
    pub fn rollback(&mut self) {
        for sink in &mut self.sinks {
            sink.rollback();
        }
    }
}

impl Extend<FileSink> for SinkRegistry {
    fn extend<I: IntoIterator<Item = FileSink>>(&mut self, iter: I) {
        self.sinks.extend(iter);
    }
}

impl FromIterator<FileSink> for SinkRegistry {
    fn from_iter<I: IntoIterator<Item = FileSink>>(iter: I) -> Self {
        Self {
            sinks: iter.into_iter().collect(),
        }
    }
}
