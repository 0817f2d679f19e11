//! Recorded (non-fatal) problems found in a bag.

use std::fmt;

/// Classification of a recorded problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required file or directory is absent.
    Structural,
    /// A manifest lists a file that is not on disk.
    MissingFile,
    /// A file's digest differs from the one recorded.
    ChecksumMismatch,
    /// `bagit.txt` is malformed or declares something unusable.
    Marker,
    /// `bag-info.txt` breaks a metadata rule.
    Metadata,
    /// A fetch entry could not be retrieved.
    Fetch,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One problem found in a bag: where, and what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub location: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            message: message.into(),
        }
    }

    /// `(location, message)` pair.
    pub fn as_pair(&self) -> (&str, &str) {
        (&self.location, &self.message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.location, self.message, self.kind)
    }
}

impl std::error::Error for ValidationError {}
