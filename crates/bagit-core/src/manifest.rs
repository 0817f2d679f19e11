//! Payload manifests and tag manifests.
//!
//! Both are `digest path` tables for a single algorithm, written sorted by
//! path. They differ only in file-name prefix and in which files the bag
//! feeds to [`ManifestRecord::update`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::encoding::TagEncoding;
use crate::error::{BagError, BagResult};
use crate::files::relative_path;
use crate::hash::Algorithm;
use crate::validation::{ErrorKind, ValidationError};

/// Which files a manifest covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    /// `manifest-<alg>.txt`, covering the payload.
    Payload,
    /// `tagmanifest-<alg>.txt`, covering tag files.
    Tag,
}

impl ManifestKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Payload => "manifest",
            Self::Tag => "tagmanifest",
        }
    }

    pub fn file_name(self, algorithm: Algorithm) -> String {
        format!("{}-{}.txt", self.prefix(), algorithm.canonical_name())
    }

    /// Algorithm part of a manifest file name, if `name` is one of ours.
    pub fn algorithm_in<'a>(self, name: &'a str) -> Option<&'a str> {
        let rest = name.strip_prefix(self.prefix())?.strip_prefix('-')?;
        let algorithm = rest.strip_suffix(".txt")?;
        (!algorithm.is_empty() && algorithm.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
            .then_some(algorithm)
    }
}

/// Checksums for one algorithm, keyed by bag-relative path.
#[derive(Debug, Clone)]
pub struct ManifestRecord {
    kind: ManifestKind,
    algorithm: Algorithm,
    root: PathBuf,
    file_path: PathBuf,
    encoding: TagEncoding,
    entries: BTreeMap<String, String>,
}

/// Tag manifests share the payload manifest's representation.
pub type TagManifestRecord = ManifestRecord;

impl ManifestRecord {
    /// Load the manifest for `algorithm` under `root`.
    ///
    /// A missing file is an empty manifest; the file is created empty when
    /// `root` exists.
    pub fn open(
        kind: ManifestKind,
        algorithm: Algorithm,
        root: &Path,
        encoding: TagEncoding,
    ) -> BagResult<Self> {
        let file_path = root.join(kind.file_name(algorithm));
        let mut record = Self {
            kind,
            algorithm,
            root: root.to_path_buf(),
            file_path,
            encoding,
            entries: BTreeMap::new(),
        };

        if record.file_path.is_file() {
            record.read()?;
        } else if root.is_dir() {
            fs::write(&record.file_path, b"").map_err(BagError::io(&record.file_path))?;
        }
        Ok(record)
    }

    /// Replace the in-memory table with the file's contents.
    ///
    /// Each line is a digest, whitespace, then the path (which may itself
    /// contain spaces). Lines without a path are ignored.
    pub fn read(&mut self) -> BagResult<()> {
        let text = self.encoding.read_text(&self.file_path)?;
        let mut entries = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            let Some((digest, path)) = line.split_once(char::is_whitespace) else {
                continue;
            };
            let path = path.trim_start();
            if !path.is_empty() {
                entries.insert(path.to_string(), digest.to_string());
            }
        }
        self.entries = entries;
        Ok(())
    }

    /// Drop every entry and truncate the file.
    pub fn clear(&mut self) -> BagResult<()> {
        self.entries.clear();
        fs::write(&self.file_path, b"").map_err(BagError::io(&self.file_path))
    }

    /// Rebuild the table from `files`, replacing whatever was there.
    ///
    /// Files that do not exist or lie outside the bag root are skipped.
    pub fn update(&mut self, files: &[PathBuf]) -> BagResult<()> {
        let mut entries = BTreeMap::new();
        for file in files {
            if !file.is_file() {
                continue;
            }
            let Some(rel) = relative_path(&self.root, file) else {
                continue;
            };
            let digest = self.algorithm.digest_file(file)?;
            entries.insert(rel, digest);
        }
        self.entries = entries;
        self.write()?;

        debug!(
            manifest = %self.file_name(),
            entries = self.entries.len(),
            "manifest updated"
        );
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (path, digest) in &self.entries {
            out.push_str(digest);
            out.push(' ');
            out.push_str(path);
            out.push('\n');
        }
        out
    }

    /// Write the table to disk, sorted by path.
    pub fn write(&self) -> BagResult<()> {
        self.encoding.write_text(&self.file_path, &self.render())
    }

    /// Recorded digest for a bag-relative or absolute path.
    pub fn hash(&self, path: impl AsRef<Path>) -> Option<&str> {
        let path = path.as_ref();
        if let Some(digest) = path.to_str().and_then(|p| self.entries.get(p)) {
            return Some(digest.as_str());
        }
        let rel = relative_path(&self.root, path)?;
        self.entries.get(&rel).map(String::as_str)
    }

    pub fn calculate_hash(&self, path: &Path) -> BagResult<String> {
        self.algorithm.digest_file(path)
    }

    /// Check the manifest against the disk, appending every problem found.
    ///
    /// Returns true when nothing was appended.
    pub fn validate(&self, errors: &mut Vec<ValidationError>) -> bool {
        let before = errors.len();

        if !self.file_path.is_file() {
            let name = self.file_name();
            errors.push(ValidationError::new(
                ErrorKind::Structural,
                name.clone(),
                format!("{name} does not exist."),
            ));
            return false;
        }

        for (rel, recorded) in &self.entries {
            let full = self.root.join(rel);
            if !full.is_file() {
                errors.push(ValidationError::new(
                    ErrorKind::MissingFile,
                    rel.as_str(),
                    "Missing data file.",
                ));
                continue;
            }
            match self.algorithm.digest_file(&full) {
                Ok(actual) if actual.eq_ignore_ascii_case(recorded) => {}
                Ok(_) => errors.push(ValidationError::new(
                    ErrorKind::ChecksumMismatch,
                    rel.as_str(),
                    "Checksum mismatch.",
                )),
                Err(e) => errors.push(ValidationError::new(
                    ErrorKind::Structural,
                    rel.as_str(),
                    format!("Error reading data file: {e}"),
                )),
            }
        }

        before == errors.len()
    }

    /// Switch to `algorithm`, renaming the backing file to match.
    ///
    /// Entries are kept as they are; run [`update`](Self::update) to recompute.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) -> BagResult<()> {
        let new_path = self.root.join(self.kind.file_name(algorithm));
        if new_path != self.file_path && self.file_path.exists() {
            fs::rename(&self.file_path, &new_path).map_err(BagError::io(&self.file_path))?;
        }
        self.file_path = new_path;
        self.algorithm = algorithm;
        Ok(())
    }

    /// Delete the backing file, consuming the record.
    pub fn remove_file(self) -> BagResult<()> {
        if self.file_path.exists() {
            fs::remove_file(&self.file_path).map_err(BagError::io(&self.file_path))?;
        }
        Ok(())
    }

    pub fn kind(&self) -> ManifestKind {
        self.kind
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn file_name(&self) -> String {
        self.kind.file_name(self.algorithm)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn encoding(&self) -> &TagEncoding {
        &self.encoding
    }

    pub fn set_encoding(&mut self, encoding: TagEncoding) {
        self.encoding = encoding;
    }
}
