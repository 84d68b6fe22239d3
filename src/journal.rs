//! Append-only run journal.
//!
//! Every notable action of a run (scheduled delete, delete, move, extraction,
//! folder rename/tag, corrupt archive) becomes one timestamped line in the
//! configured log file. The journal is the user-facing record of a run and is
//! kept separate from the `tracing` diagnostics set up in [`crate::logging`].
//!
//! A journal that can no longer be written is fatal: without it there is no
//! reliable way to report what the run did, so [`JournalError`] aborts the run
//! and the binary exits with [`EXIT_LOG_FAILURE`].

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::OpenOptions;
use std::io::{self, Write};
use thiserror::Error;

/// Process exit status used when the journal cannot be written.
pub const EXIT_LOG_FAILURE: u8 = 74;

/// Failure to write the journal.
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Failed to open journal {path}: {source}")]
    Open {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write journal: {0}")]
    Write(#[source] io::Error),
}

/// Timestamped, line-oriented action log.
pub struct Journal {
    sink: Box<dyn Write + Send>,
    entries: Vec<String>,
}

impl Journal {
    /// Open (or create) `path` for appending.
    pub fn open(path: &Utf8Path) -> Result<Self, JournalError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| JournalError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!("Journal opened at {}", path);
        Ok(Self::with_writer(io::BufWriter::new(file)))
    }

    /// Journal that only keeps entries in memory.
    pub fn in_memory() -> Self {
        Self::with_writer(io::sink())
    }

    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            sink: Box::new(writer),
            entries: Vec::new(),
        }
    }

    /// Append one line and flush it.
    pub fn record(&mut self, message: impl Into<String>) -> Result<(), JournalError> {
        let message = message.into();
        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");

        writeln!(self.sink, "{} {}", timestamp, message).map_err(JournalError::Write)?;
        self.sink.flush().map_err(JournalError::Write)?;

        tracing::info!(target: "romtidy::journal", "{}", message);
        self.entries.push(message);
        Ok(())
    }

    /// Messages recorded so far, without timestamps.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Position of the first entry starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.starts_with(prefix))
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("entries", &self.entries.len())
            .finish()
    }
}
