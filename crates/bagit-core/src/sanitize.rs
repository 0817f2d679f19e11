//! Payload file-name sanitizing.
//!
//! Rules:
//! - runs of whitespace become `_`
//! - `..` and the characters `~ ^ @ ! # % & * / : ' ? " < > |` are removed
//! - Windows device names (`CON`, `COM1`, `LPT9`, ...) are lower-cased and get
//!   a random `_NNNNNN` suffix
//! - a name left empty becomes `_`

use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::info;

use crate::error::{BagError, BagResult};

const STRIPPED: &[char] = &[
    '~', '^', '@', '!', '#', '%', '&', '*', '/', ':', '\'', '?', '"', '<', '>', '|',
];

const DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "CLOCK$", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
    "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Clean one path component.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            in_space = false;
            out.push(c);
        }
    }

    let mut out = out.replace("..", "");
    out.retain(|c| !STRIPPED.contains(&c));

    if is_device_name(&out) {
        let suffix: u32 = rand::thread_rng().gen_range(100_000..=999_999);
        out = format!("{}_{suffix}", out.to_ascii_lowercase());
    }

    if out.is_empty() {
        out.push('_');
    }
    out
}

pub fn is_device_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    DEVICE_NAMES.contains(&upper.as_str())
}

/// First free name in `dir` for `clean`: `clean`, then `stem_1.ext`, `stem_2.ext`, ...
fn free_target(dir: &Path, clean: &str) -> PathBuf {
    let candidate = dir.join(clean);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match clean.rfind('.') {
        Some(i) if i > 0 => (&clean[..i], &clean[i..]),
        _ => (clean, ""),
    };
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{stem}_{n}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Rename `file` in place if its base name needs sanitizing.
///
/// Returns the new path when a rename happened.
pub fn sanitize_in_place(file: &Path) -> BagResult<Option<PathBuf>> {
    let (Some(dir), Some(name)) = (file.parent(), file.file_name().and_then(|n| n.to_str())) else {
        return Ok(None);
    };

    let clean = sanitize_file_name(name);
    if clean == name {
        return Ok(None);
    }

    let target = free_target(dir, &clean);
    fs::rename(file, &target).map_err(BagError::io(file))?;
    info!(from = %file.display(), to = %target.display(), "renamed payload file");
    Ok(Some(target))
}
