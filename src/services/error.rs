use crate::journal::JournalError;
use camino::{Utf8Path, Utf8PathBuf};
use std::io;
use thiserror::Error;

/// Errors that can abort (or, for archives, be recovered inside) a run
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("I/O failure at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied: {path}")]
    PermissionDenied {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt or unreadable archive {path}: {reason}")]
    ArchiveCorrupt { path: Utf8PathBuf, reason: String },

    #[error("Collection root is not a directory: {0}")]
    RootMissing(Utf8PathBuf),

    #[error("Failed to read a decision: {0}")]
    Prompt(#[source] io::Error),

    #[error(transparent)]
    Journal(#[from] JournalError),
}

impl ReconcileError {
    /// Classify an I/O error observed at `path`.
    pub fn io(path: &Utf8Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            ReconcileError::PermissionDenied {
                path: path.to_path_buf(),
                source,
            }
        } else {
            ReconcileError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Adapter for `map_err`.
    pub fn at(path: &Utf8Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::io(path, source)
    }

    /// True when the run cannot report anything further.
    pub fn is_journal_failure(&self) -> bool {
        matches!(self, ReconcileError::Journal(_))
    }
}
