//! Digest algorithms a bag may use, and the registry of those this host can compute.
//!
//! Bags name algorithms without punctuation (`sha3256`); the digest crates and
//! most tooling use the hyphenated form (`sha3-256`). Both spellings resolve to
//! the same [`Algorithm`].

use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use sha2::Digest;

use crate::error::{BagError, BagResult};

/// Algorithm used when none is requested.
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::Sha512;

/// The fixed set of algorithms a manifest may be named after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
}

impl Algorithm {
    pub const ALL: [Algorithm; 9] = [
        Algorithm::Md5,
        Algorithm::Sha1,
        Algorithm::Sha256,
        Algorithm::Sha384,
        Algorithm::Sha512,
        Algorithm::Sha3_224,
        Algorithm::Sha3_256,
        Algorithm::Sha3_384,
        Algorithm::Sha3_512,
    ];

    /// Name used in manifest file names (`manifest-<name>.txt`).
    pub fn canonical_name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Sha3_224 => "sha3224",
            Self::Sha3_256 => "sha3256",
            Self::Sha3_384 => "sha3384",
            Self::Sha3_512 => "sha3512",
        }
    }

    /// Name the digest primitive knows the algorithm by.
    pub fn host_name(self) -> &'static str {
        match self {
            Self::Sha3_224 => "sha3-224",
            Self::Sha3_256 => "sha3-256",
            Self::Sha3_384 => "sha3-384",
            Self::Sha3_512 => "sha3-512",
            other => other.canonical_name(),
        }
    }

    /// Look up either spelling, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.canonical_name() == name || a.host_name() == name)
    }

    /// Lowercase hex digest of everything `reader` yields.
    pub fn digest_reader<R: Read>(self, reader: R) -> io::Result<String> {
        match self {
            Self::Md5 => md5_hex_reader(reader),
            Self::Sha1 => hex_reader::<sha1::Sha1, _>(reader),
            Self::Sha256 => hex_reader::<sha2::Sha256, _>(reader),
            Self::Sha384 => hex_reader::<sha2::Sha384, _>(reader),
            Self::Sha512 => hex_reader::<sha2::Sha512, _>(reader),
            Self::Sha3_224 => hex_reader::<sha3::Sha3_224, _>(reader),
            Self::Sha3_256 => hex_reader::<sha3::Sha3_256, _>(reader),
            Self::Sha3_384 => hex_reader::<sha3::Sha3_384, _>(reader),
            Self::Sha3_512 => hex_reader::<sha3::Sha3_512, _>(reader),
        }
    }

    pub fn digest_bytes(self, bytes: &[u8]) -> String {
        // Reading from a slice cannot fail.
        self.digest_reader(bytes).unwrap_or_default()
    }

    /// Lowercase hex digest of the file at `path`.
    pub fn digest_file(self, path: &Path) -> BagResult<String> {
        let file = File::open(path).map_err(BagError::io(path))?;
        self.digest_reader(BufReader::new(file))
            .map_err(BagError::io(path))
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl FromStr for Algorithm {
    type Err = BagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| BagError::UnsupportedAlgorithm {
            algorithm: s.to_string(),
        })
    }
}

fn hex_reader<D: Digest, R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buf = [0_u8; 8192];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

fn md5_hex_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut ctx = md5::Context::new();
    let mut buf = [0_u8; 8192];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        ctx.consume(&buf[..n]);
    }

    Ok(format!("{:x}", ctx.compute()))
}

/// Algorithms this host can compute, intersected with [`Algorithm::ALL`].
///
/// Built once and passed to each bag; it never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRegistry {
    available: BTreeSet<Algorithm>,
}

impl HashRegistry {
    /// Every algorithm compiled into this build.
    pub fn detect() -> Self {
        Self::with_available(Algorithm::ALL)
    }

    /// A registry limited to `available`, for hosts that lack some primitives.
    pub fn with_available(available: impl IntoIterator<Item = Algorithm>) -> Self {
        Self {
            available: available.into_iter().collect(),
        }
    }

    pub fn is_supported(&self, name: &str) -> bool {
        Algorithm::from_name(name).is_some_and(|a| self.available.contains(&a))
    }

    /// Resolve a requested name to an algorithm this host can compute.
    pub fn resolve(&self, name: &str) -> BagResult<Algorithm> {
        match Algorithm::from_name(name) {
            Some(algorithm) if self.available.contains(&algorithm) => Ok(algorithm),
            _ => Err(BagError::UnsupportedAlgorithm {
                algorithm: name.to_string(),
            }),
        }
    }

    pub fn algorithms(&self) -> impl Iterator<Item = Algorithm> + '_ {
        self.available.iter().copied()
    }

    /// Canonical name to host name, for supported algorithms only.
    pub fn host_name(&self, canonical: &str) -> Option<&'static str> {
        self.resolve(canonical).ok().map(Algorithm::host_name)
    }

    /// Host name to canonical name, for supported algorithms only.
    pub fn canonical_name(&self, host: &str) -> Option<&'static str> {
        self.resolve(host).ok().map(Algorithm::canonical_name)
    }
}

impl Default for HashRegistry {
    fn default() -> Self {
        Self::detect()
    }
}
