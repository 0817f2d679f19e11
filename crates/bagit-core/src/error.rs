//! Error types for bag operations.
//!
//! Problems found while checking a bag are not errors in this sense; they are
//! collected as [`ValidationError`](crate::ValidationError) values. `BagError`
//! covers rejected requests and failures that stop an operation.

use std::path::{Path, PathBuf};

use bagit_archive::ArchiveError;
use thiserror::Error;

use crate::fetch::FetchError;

/// Result type for bag operations.
pub type BagResult<T> = Result<T, BagError>;

/// Errors returned by bag operations.
#[derive(Debug, Error)]
pub enum BagError {
    /// The host cannot compute the requested digest algorithm.
    #[error("hash encoding not supported: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// A non-repeatable bag-info field already holds a value under this key.
    #[error("cannot set more than one value for non-repeatable field '{key}'")]
    DuplicateNonRepeatableField { key: String },

    /// Refused to drop the only payload manifest.
    #[error("cannot remove the last hash encoding ({algorithm}); add another before removing this one")]
    LastAlgorithmRemoval { algorithm: String },

    /// Packaging request could not be honoured.
    #[error("packaging failed: {message}")]
    Packaging { message: String },

    /// The archive collaborator failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Remote payload transfer could not be set up.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Destination payload file already exists.
    #[error("file already exists: {}", path.display())]
    FileExists { path: PathBuf },

    /// Source file to add does not exist.
    #[error("source file does not exist: {}", path.display())]
    MissingSource { path: PathBuf },

    /// Destination is not a usable path inside the bag.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Filesystem error, with the path it concerned.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BagError {
    /// Returns true when the request itself was rejected before anything on
    /// disk or in memory changed.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedAlgorithm { .. }
                | Self::DuplicateNonRepeatableField { .. }
                | Self::LastAlgorithmRemoval { .. }
                | Self::FileExists { .. }
                | Self::MissingSource { .. }
                | Self::InvalidPath { .. }
        )
    }

    /// Returns true if this error came from packing or unpacking an archive.
    pub fn is_packaging(&self) -> bool {
        matches!(self, Self::Packaging { .. } | Self::Archive(_))
    }

    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_classification() {
        assert!(BagError::LastAlgorithmRemoval {
            algorithm: "sha512".into()
        }
        .is_precondition());
        assert!(!BagError::Packaging {
            message: "x".into()
        }
        .is_precondition());
        assert!(BagError::from(ArchiveError::UnsupportedMethod {
            method: "rar".into()
        })
        .is_packaging());
    }

    #[test]
    fn archive_errors_display_transparently() {
        let err = BagError::from(ArchiveError::UnsupportedMethod {
            method: "rar".into(),
        });
        assert_eq!(err.to_string(), "invalid compression method: 'rar'");
    }
}
