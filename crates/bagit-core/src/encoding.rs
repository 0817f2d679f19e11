//! Text codec for tag files.
//!
//! `bagit.txt` declares the character encoding every other tag file is
//! written in. Labels are resolved with the WHATWG rules in `encoding_rs`.

use std::fs;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};

use crate::error::{BagError, BagResult};

pub const DEFAULT_ENCODING_LABEL: &str = "UTF-8";

/// A declared tag-file encoding: the label as written plus the resolved codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEncoding {
    label: String,
    encoding: &'static Encoding,
}

impl TagEncoding {
    pub fn utf8() -> Self {
        Self {
            label: DEFAULT_ENCODING_LABEL.to_string(),
            encoding: UTF_8,
        }
    }

    /// Resolve `label`, or `None` when no codec is known under that name.
    pub fn for_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Encoding::for_label(label.as_bytes()).map(|encoding| Self {
            label: label.to_string(),
            encoding,
        })
    }

    /// The label as declared in `bagit.txt`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Canonical WHATWG name of the resolved codec.
    pub fn codec_name(&self) -> &'static str {
        self.encoding.name()
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, _, _) = self.encoding.decode(bytes);
        text.into_owned()
    }

    pub fn encode(&self, text: &str) -> Vec<u8> {
        let (bytes, _, _) = self.encoding.encode(text);
        bytes.into_owned()
    }

    pub fn read_text(&self, path: &Path) -> BagResult<String> {
        let bytes = fs::read(path).map_err(BagError::io(path))?;
        Ok(self.decode(&bytes))
    }

    pub fn write_text(&self, path: &Path, text: &str) -> BagResult<()> {
        fs::write(path, self.encode(text)).map_err(BagError::io(path))
    }
}

impl Default for TagEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}
