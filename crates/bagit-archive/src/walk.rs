//! Deterministic directory listing and entry-path checks shared by the codecs.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ArchiveError, ArchiveResult};

/// One file or directory to be written into an archive.
#[derive(Debug, Clone)]
pub(crate) struct SourceEntry {
    /// POSIX path inside the archive, rooted at the source directory's base name.
    pub name: String,
    /// Absolute location on disk.
    pub path: PathBuf,
    pub is_dir: bool,
}

/// List `source` recursively in sorted order, the directory itself first.
///
/// Entry names keep the base directory name as their first component so that
/// unpacking recreates `<base>/...` rather than spilling files into the
/// extraction directory.
pub(crate) fn collect_entries(source: &Path) -> ArchiveResult<Vec<SourceEntry>> {
    let base = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ArchiveError::UnsafePath {
            path: source.display().to_string(),
        })?
        .to_string();

    let mut entries = Vec::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| ArchiveError::UnsafePath {
                path: entry.path().display().to_string(),
            })?;

        let mut name = base.clone();
        for component in rel.components() {
            name.push('/');
            name.push_str(&component.as_os_str().to_string_lossy());
        }

        entries.push(SourceEntry {
            name,
            path: entry.path().to_path_buf(),
            is_dir: entry.file_type().is_dir(),
        });
    }
    Ok(entries)
}

/// Reject entry names that are absolute or climb out of the extraction root.
pub(crate) fn checked_relative(name: &Path) -> ArchiveResult<PathBuf> {
    let mut out = PathBuf::new();
    for component in name.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => {
                return Err(ArchiveError::UnsafePath {
                    path: name.display().to_string(),
                })
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(ArchiveError::UnsafePath {
            path: name.display().to_string(),
        });
    }
    Ok(out)
}

/// Locate the unpacked bag: `dir` itself when it holds `marker`, otherwise
/// its only top-level directory.
pub fn locate_root(dir: &Path, marker: &str) -> ArchiveResult<PathBuf> {
    if dir.join(marker).is_file() {
        return Ok(dir.to_path_buf());
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(ArchiveError::io(dir))? {
        let entry = entry.map_err(ArchiveError::io(dir))?;
        if entry.path().is_dir() {
            candidates.push(entry.path());
        }
    }

    match candidates.as_slice() {
        [only] => Ok(only.clone()),
        _ => candidates
            .into_iter()
            .find(|c| c.join(marker).is_file())
            .ok_or_else(|| ArchiveError::MissingBagRoot {
                dir: dir.to_path_buf(),
            }),
    }
}
