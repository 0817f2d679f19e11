//! `fetch.txt`: payload files to be retrieved from elsewhere.
//!
//! The list only records and orders entries. Moving bytes is delegated to a
//! [`Fetcher`]; [`HttpFetcher`] is the stock implementation.

mod http;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::encoding::TagEncoding;
use crate::error::{BagError, BagResult};
use crate::files::resolve_inside;
use crate::validation::{ErrorKind, ValidationError};

pub use http::{HttpFetcher, USER_AGENT_VALUE};

pub const FETCH_FILE: &str = "fetch.txt";

/// Errors from a single transfer.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Transfers one remote resource to a local file.
pub trait Fetcher {
    /// Write the body at `url` to `dest`, returning the byte count.
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// One `url length path` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchEntry {
    pub url: String,
    /// `None` is written as `-`.
    pub length: Option<u64>,
    /// Bag-relative destination, forward slashes.
    pub path: String,
}

impl FetchEntry {
    pub fn new(url: impl Into<String>, length: Option<u64>, path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            length,
            path: path.into(),
        }
    }

    /// Parse a line with exactly three whitespace-separated fields.
    ///
    /// A length that is not a number is read as unknown.
    pub fn parse_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [url, length, path] = fields.as_slice() else {
            return None;
        };
        Some(Self::new(*url, length.parse().ok(), *path))
    }
}

impl fmt::Display for FetchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.length {
            Some(len) => write!(f, "{} {} {}", self.url, len, self.path),
            None => write!(f, "{} - {}", self.url, self.path),
        }
    }
}

/// Ordered fetch entries backed by `fetch.txt` in the bag root.
#[derive(Debug, Clone)]
pub struct FetchList {
    file_path: PathBuf,
    encoding: TagEncoding,
    entries: Vec<FetchEntry>,
}

impl FetchList {
    /// Load `fetch.txt` under `root`, or start empty if there is none.
    pub fn open(root: &Path, encoding: TagEncoding) -> BagResult<Self> {
        let mut list = Self {
            file_path: root.join(FETCH_FILE),
            encoding,
            entries: Vec::new(),
        };
        if list.file_path.is_file() {
            list.read()?;
        }
        Ok(list)
    }

    /// Replace the entries with the file's contents; malformed lines are skipped.
    pub fn read(&mut self) -> BagResult<()> {
        let text = self.encoding.read_text(&self.file_path)?;
        self.entries = text.lines().filter_map(FetchEntry::parse_line).collect();
        Ok(())
    }

    /// Persist the entries. With no entries the file is removed.
    pub fn write(&self) -> BagResult<()> {
        if self.entries.is_empty() {
            if self.file_path.exists() {
                fs::remove_file(&self.file_path).map_err(BagError::io(&self.file_path))?;
            }
            return Ok(());
        }

        let mut text = String::new();
        for entry in &self.entries {
            text.push_str(&entry.to_string());
            text.push('\n');
        }
        self.encoding.write_text(&self.file_path, &text)
    }

    /// Append an entry of unknown length and write immediately.
    pub fn add(&mut self, url: impl Into<String>, path: impl Into<String>) -> BagResult<()> {
        self.entries.push(FetchEntry::new(url, None, path));
        self.write()
    }

    /// Drop every entry and remove the file.
    pub fn clear(&mut self) -> BagResult<()> {
        self.entries.clear();
        self.write()
    }

    /// Replace the entries in memory without writing.
    pub fn load(&mut self, entries: impl IntoIterator<Item = FetchEntry>) {
        self.entries = entries.into_iter().collect();
    }

    pub fn entries(&self) -> &[FetchEntry] {
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

    pub fn encoding(&self) -> &TagEncoding {
        &self.encoding
    }

    pub fn set_encoding(&mut self, encoding: TagEncoding) {
        self.encoding = encoding;
    }

    /// Retrieve every entry whose destination is not on disk yet.
    ///
    /// Failures are recorded in `errors` and any partial file is deleted;
    /// the remaining entries are still attempted. Returns how many files
    /// were written.
    pub fn download(&self, fetcher: &dyn Fetcher, errors: &mut Vec<ValidationError>) -> usize {
        let Some(root) = self.file_path.parent() else {
            return 0;
        };

        let mut fetched = 0;
        for entry in &self.entries {
            let dest = match resolve_inside(root, &entry.path) {
                Ok(dest) => dest,
                Err(e) => {
                    warn!(path = %entry.path, "skipping fetch entry: {e}");
                    errors.push(ValidationError::new(
                        ErrorKind::Fetch,
                        entry.path.as_str(),
                        e.to_string(),
                    ));
                    continue;
                }
            };
            if dest.exists() {
                debug!(path = %entry.path, "already present, not fetching");
                continue;
            }

            if let Some(parent) = dest.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    errors.push(ValidationError::new(
                        ErrorKind::Fetch,
                        entry.path.as_str(),
                        format!("Error creating directory: {e}"),
                    ));
                    continue;
                }
            }

            match fetcher.fetch(&entry.url, &dest) {
                Ok(bytes) => {
                    info!(url = %entry.url, path = %entry.path, bytes, "fetched payload file");
                    fetched += 1;
                }
                Err(e) => {
                    warn!(url = %entry.url, path = %entry.path, error = %e, "fetch failed");
                    let mut message = format!("Error fetching {}: {e}", entry.url);
                    if dest.exists() {
                        if let Err(cleanup) = fs::remove_file(&dest) {
                            warn!(
                                path = %dest.display(),
                                error = %cleanup,
                                "could not remove partial file"
                            );
                            message = format!("{message} (partial file not removed: {cleanup})");
                        }
                    }
                    errors.push(ValidationError::new(
                        ErrorKind::Fetch,
                        entry.path.as_str(),
                        message,
                    ));
                }
            }
        }
        fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves bodies from memory and records every request.
    #[derive(Default)]
    struct StubFetcher {
        bodies: HashMap<String, Vec<u8>>,
        requested: RefCell<Vec<String>>,
    }

    impl StubFetcher {
        fn with(mut self, url: &str, body: &[u8]) -> Self {
            self.bodies.insert(url.to_string(), body.to_vec());
            self
        }
    }

    impl Fetcher for StubFetcher {
        fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
            self.requested.borrow_mut().push(url.to_string());
            match self.bodies.get(url) {
                Some(body) => {
                    fs::write(dest, body).map_err(|source| FetchError::Io {
                        path: dest.to_path_buf(),
                        source,
                    })?;
                    Ok(body.len() as u64)
                }
                None => {
                    // Leave a partial file behind, as an interrupted transfer would.
                    fs::write(dest, b"partial").map_err(|source| FetchError::Io {
                        path: dest.to_path_buf(),
                        source,
                    })?;
                    Err(FetchError::Status {
                        url: url.to_string(),
                        status: 404,
                    })
                }
            }
        }
    }

    #[test]
    fn parse_line_requires_three_fields() {
        assert_eq!(
            FetchEntry::parse_line("http://x/a 12 data/a.txt"),
            Some(FetchEntry::new("http://x/a", Some(12), "data/a.txt"))
        );
        assert_eq!(
            FetchEntry::parse_line("http://x/a\t-\tdata/a.txt").map(|e| e.length),
            Some(None)
        );
        assert_eq!(FetchEntry::parse_line("http://x/a data/a.txt"), None);
        assert_eq!(FetchEntry::parse_line("a b c d"), None);
    }

    #[test]
    fn add_persists_immediately_and_clear_removes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut list = FetchList::open(tmp.path(), TagEncoding::utf8()).unwrap();
        assert!(!list.file_path().exists());

        list.add("http://example.org/a.txt", "data/a.txt").unwrap();
        list.add("http://example.org/b.txt", "data/b.txt").unwrap();
        assert_eq!(
            fs::read_to_string(list.file_path()).unwrap(),
            "http://example.org/a.txt - data/a.txt\nhttp://example.org/b.txt - data/b.txt\n"
        );

        let reopened = FetchList::open(tmp.path(), TagEncoding::utf8()).unwrap();
        assert_eq!(reopened.entries(), list.entries());

        list.clear().unwrap();
        assert!(list.is_empty());
        assert!(!list.file_path().exists());
    }

    #[test]
    fn load_replaces_without_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut list = FetchList::open(tmp.path(), TagEncoding::utf8()).unwrap();
        list.load([FetchEntry::new("http://x/y", Some(3), "data/y")]);
        assert_eq!(list.len(), 1);
        assert!(!list.file_path().exists());
        list.write().unwrap();
        assert_eq!(
            fs::read_to_string(list.file_path()).unwrap(),
            "http://x/y 3 data/y\n"
        );
    }

    #[test]
    fn download_skips_existing_and_continues_after_failure() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("data")).unwrap();
        fs::write(tmp.path().join("data/have.txt"), "local").unwrap();

        let mut list = FetchList::open(tmp.path(), TagEncoding::utf8()).unwrap();
        list.load([
            FetchEntry::new("http://h/have", None, "data/have.txt"),
            FetchEntry::new("http://h/missing", None, "data/missing.txt"),
            FetchEntry::new("http://h/ok", Some(2), "data/deep/ok.txt"),
        ]);

        let fetcher = StubFetcher::default().with("http://h/ok", b"ok");
        let mut errors = Vec::new();
        let fetched = list.download(&fetcher, &mut errors);

        assert_eq!(fetched, 1);
        assert_eq!(
            *fetcher.requested.borrow(),
            vec!["http://h/missing".to_string(), "http://h/ok".to_string()]
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join("data/deep/ok.txt")).unwrap(),
            "ok"
        );
        assert!(!tmp.path().join("data/missing.txt").exists());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Fetch);
        assert_eq!(errors[0].location, "data/missing.txt");
    }

    /// Fails every transfer after leaving a directory where the file should be.
    struct BlockingFetcher;

    impl Fetcher for BlockingFetcher {
        fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
            fs::create_dir_all(dest).map_err(|source| FetchError::Io {
                path: dest.to_path_buf(),
                source,
            })?;
            Err(FetchError::Status {
                url: url.to_string(),
                status: 500,
            })
        }
    }

    #[test]
    fn download_reports_partial_file_it_could_not_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let mut list = FetchList::open(tmp.path(), TagEncoding::utf8()).unwrap();
        list.load([
            FetchEntry::new("http://h/a", None, "data/a.txt"),
            FetchEntry::new("http://h/b", None, "data/b.txt"),
        ]);

        let mut errors = Vec::new();
        assert_eq!(list.download(&BlockingFetcher, &mut errors), 0);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].location, "data/b.txt");
        assert!(errors[0].message.starts_with("Error fetching http://h/a:"));
        assert!(errors[0].message.contains("partial file not removed"));
    }

    #[test]
    fn download_refuses_destinations_outside_the_bag() {
        let tmp = tempfile::tempdir().unwrap();
        let bag = tmp.path().join("bag");
        fs::create_dir_all(&bag).unwrap();
        let mut list = FetchList::open(&bag, TagEncoding::utf8()).unwrap();
        list.load([FetchEntry::new("http://h/x", None, "../escape.txt")]);

        let fetcher = StubFetcher::default().with("http://h/x", b"x");
        let mut errors = Vec::new();
        assert_eq!(list.download(&fetcher, &mut errors), 0);
        assert!(fetcher.requested.borrow().is_empty());
        assert!(!tmp.path().join("escape.txt").exists());
        assert_eq!(errors.len(), 1);
    }
}
