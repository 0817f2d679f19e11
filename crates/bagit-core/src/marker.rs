//! The `bagit.txt` marker file: declared version and tag-file encoding.

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::encoding::{TagEncoding, DEFAULT_ENCODING_LABEL};
use crate::error::{BagError, BagResult};
use crate::validation::{ErrorKind, ValidationError};

pub const MARKER_FILE: &str = "bagit.txt";

const VERSION_KEY: &str = "bagit-version";
const ENCODING_KEY: &str = "tag-file-character-encoding";

/// Declared `BagIt-Version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BagVersion {
    pub major: u32,
    pub minor: u32,
}

impl BagVersion {
    pub const DEFAULT: BagVersion = BagVersion { major: 1, minor: 0 };

    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl Default for BagVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for BagVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// What a marker file declared, and what was wrong with it.
#[derive(Debug, Clone)]
pub struct MarkerInfo {
    pub version: BagVersion,
    pub encoding: TagEncoding,
    pub errors: Vec<ValidationError>,
}

impl Default for MarkerInfo {
    fn default() -> Self {
        Self {
            version: BagVersion::DEFAULT,
            encoding: TagEncoding::utf8(),
            errors: Vec::new(),
        }
    }
}

fn field<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        k.trim().eq_ignore_ascii_case(key).then_some(v.trim())
    })
}

/// `BagIt-Version: M.N`, matched case-insensitively. Non-integer parts count as absent.
pub fn parse_version(text: &str) -> Option<BagVersion> {
    let value = field(text, VERSION_KEY)?;
    let (major, minor) = value.split_once('.')?;
    Some(BagVersion {
        major: major.trim().parse().ok()?,
        minor: minor.trim().parse().ok()?,
    })
}

pub fn parse_encoding(text: &str) -> Option<String> {
    field(text, ENCODING_KEY)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Read a marker file. A missing file yields the defaults without errors.
pub fn read_marker(path: &Path) -> BagResult<MarkerInfo> {
    if !path.is_file() {
        return Ok(MarkerInfo::default());
    }

    // The marker itself is always UTF-8.
    let text = TagEncoding::utf8().read_text(path)?;
    let mut info = MarkerInfo::default();

    match parse_version(&text) {
        Some(version) => info.version = version,
        None => {
            warn!(path = %path.display(), "bagit.txt has no usable version");
            info.errors.push(ValidationError::new(
                ErrorKind::Marker,
                "bagit",
                "Error reading version information from bagit.txt file.",
            ));
        }
    }

    match parse_encoding(&text) {
        Some(label) => match TagEncoding::for_label(&label) {
            Some(encoding) => info.encoding = encoding,
            None => {
                warn!(path = %path.display(), encoding = %label, "unknown tag file encoding");
                info.errors.push(ValidationError::new(
                    ErrorKind::Marker,
                    "bagit",
                    format!(
                        "Unknown tag file character encoding '{label}', \
                         using {DEFAULT_ENCODING_LABEL}."
                    ),
                ));
            }
        },
        None => {
            info.errors.push(ValidationError::new(
                ErrorKind::Marker,
                "bagit",
                "Error reading character encoding information from bagit.txt file.",
            ));
        }
    }

    Ok(info)
}

pub fn render_marker(version: BagVersion, encoding: &TagEncoding) -> String {
    format!(
        "BagIt-Version: {version}\nTag-File-Character-Encoding: {}\n",
        encoding.label()
    )
}

pub fn write_marker(path: &Path, version: BagVersion, encoding: &TagEncoding) -> BagResult<()> {
    fs::write(path, render_marker(version, encoding)).map_err(BagError::io(path))
}
