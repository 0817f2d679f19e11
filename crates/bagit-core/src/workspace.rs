//! Scratch directory an archived bag is unpacked into.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BagError, BagResult};

/// Owns the temporary directory behind a bag opened from an archive.
///
/// The directory is deleted when the handle is dropped, unless
/// [`keep`](Self::keep) is called.
#[derive(Debug)]
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    pub(crate) fn create(prefix: &str) -> BagResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(BagError::io(&std::env::temp_dir()))?;
        debug!(path = %dir.path().display(), "created workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Stop managing the directory and return its path; it stays on disk.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_workspace_is_removed() {
        let ws = Workspace::create("bagtest").unwrap();
        let path = ws.path().to_path_buf();
        assert!(path.is_dir());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("bagtest"));
        drop(ws);
        assert!(!path.exists());
    }

    #[test]
    fn kept_workspace_survives() {
        let ws = Workspace::create("bagtest").unwrap();
        let path = ws.keep();
        assert!(path.is_dir());
        std::fs::remove_dir_all(&path).unwrap();
    }
}
