//! Compression method detection and parsing.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ArchiveError, ArchiveResult};

/// Container formats a bag can be packaged into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveMethod {
    /// gzip-compressed tar (`.tgz` / `.tar.gz`).
    Tgz,
    /// zip with deflate (`.zip`).
    Zip,
}

impl ArchiveMethod {
    /// Parse a method name as given by a caller (`"tgz"`, `"zip"`, case-insensitive).
    pub fn parse(method: &str) -> ArchiveResult<Self> {
        match method.trim().to_ascii_lowercase().as_str() {
            "tgz" | "tar.gz" => Ok(Self::Tgz),
            "zip" => Ok(Self::Zip),
            _ => Err(ArchiveError::UnsupportedMethod {
                method: method.to_string(),
            }),
        }
    }

    /// Detect the method from a file name. Directories are never archives.
    pub fn detect(path: &Path) -> Option<Self> {
        if path.is_dir() {
            return None;
        }
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::Tgz)
        } else {
            None
        }
    }

    /// Canonical file extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Tgz => "tgz",
            Self::Zip => "zip",
        }
    }

    /// Whether `path` already carries an extension for this method.
    pub fn matches_extension(self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let name = name.to_ascii_lowercase();
        match self {
            Self::Tgz => name.ends_with(".tgz") || name.ends_with(".tar.gz"),
            Self::Zip => name.ends_with(".zip"),
        }
    }
}

impl fmt::Display for ArchiveMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveMethod {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
