//! Error types for archive operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors that can occur while packing or unpacking a bag archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The requested compression method is not one we can produce or read.
    #[error("invalid compression method: '{method}'")]
    UnsupportedMethod { method: String },

    /// An archive entry would land outside the extraction directory.
    #[error("unsafe path in archive: '{path}'")]
    UnsafePath { path: String },

    /// Extraction produced no directory that looks like a bag.
    #[error("no bag root found under {}", dir.display())]
    MissingBagRoot { dir: PathBuf },

    /// Filesystem or stream error, with the file it concerned.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed or unreadable zip container.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Directory traversal failed while collecting entries.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl ArchiveError {
    /// Returns true when the archive itself is malformed or hostile, as opposed
    /// to a local filesystem problem.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::UnsafePath { .. } | Self::Zip(_))
    }

    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
