//! Packing and unpacking of bag directories as `.tgz` or `.zip` archives.
//!
//! Archives always contain a single top-level directory named after the bag,
//! and extraction refuses entries that would escape the destination.

pub mod error;
pub mod method;
pub mod tgz;
mod walk;
pub mod zip_codec;

use std::path::Path;

pub use error::{ArchiveError, ArchiveResult};
pub use method::ArchiveMethod;
pub use tgz::TarGzCodec;
pub use walk::locate_root;
pub use zip_codec::ZipCodec;

/// A container format a bag can be written to and read from.
pub trait ArchiveCodec {
    /// Method this codec implements.
    fn method(&self) -> ArchiveMethod;

    /// Unpack `archive` into the existing directory `dest`.
    fn extract(&self, archive: &Path, dest: &Path) -> ArchiveResult<()>;

    /// Write the directory `source` (and its base name) into `archive`.
    fn create(&self, source: &Path, archive: &Path) -> ArchiveResult<()>;
}

/// Codec for a given method.
pub fn codec_for(method: ArchiveMethod) -> Box<dyn ArchiveCodec> {
    match method {
        ArchiveMethod::Tgz => Box::new(TarGzCodec),
        ArchiveMethod::Zip => Box::new(ZipCodec),
    }
}

/// Extract `archive` into `dest`, picking the codec from the file name.
pub fn extract(archive: &Path, dest: &Path) -> ArchiveResult<ArchiveMethod> {
    let method = ArchiveMethod::detect(archive).ok_or_else(|| ArchiveError::UnsupportedMethod {
        method: archive
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default(),
    })?;
    codec_for(method).extract(archive, dest)?;
    Ok(method)
}
