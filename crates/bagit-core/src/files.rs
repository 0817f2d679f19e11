//! Directory listing and path helpers shared by the bag components.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{BagError, BagResult};

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Every regular file under `dir`, recursively, sorted by path.
///
/// Hidden entries (leading `.`) and everything below hidden directories are
/// skipped. A missing `dir` lists as empty.
pub fn list_files(dir: &Path) -> BagResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));
    for entry in walker {
        let entry = entry.map_err(|e| BagError::Io {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
            source: e.into(),
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// `path` relative to `root`, with forward slashes. `None` if outside `root`.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Resolve a bag-relative path (forward slashes) against `root`, refusing
/// anything that would leave it.
pub fn resolve_inside(root: &Path, rel: &str) -> BagResult<PathBuf> {
    let mut out = root.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            _ => {
                return Err(BagError::InvalidPath {
                    path: rel.to_string(),
                    reason: "must be relative and stay inside the bag".to_string(),
                })
            }
        }
    }
    if depth == 0 {
        return Err(BagError::InvalidPath {
            path: rel.to_string(),
            reason: "empty path".to_string(),
        });
    }
    Ok(out)
}
