//! gzip-tar codec.
//!
//! Writes deterministic archives: fixed mtime, uid/gid 0, fixed modes, entries
//! in sorted order, so packaging the same tree twice yields the same bytes.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use tar::{Builder, EntryType, Header};
use tracing::debug;

use crate::error::{ArchiveError, ArchiveResult};
use crate::method::ArchiveMethod;
use crate::walk::{checked_relative, collect_entries, SourceEntry};
use crate::ArchiveCodec;

/// Codec for `.tgz` / `.tar.gz` bags.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarGzCodec;

impl ArchiveCodec for TarGzCodec {
    fn method(&self) -> ArchiveMethod {
        ArchiveMethod::Tgz
    }

    fn extract(&self, archive: &Path, dest: &Path) -> ArchiveResult<()> {
        let file = File::open(archive).map_err(ArchiveError::io(archive))?;
        let decoder = GzDecoder::new(BufReader::new(file));
        let mut tar = tar::Archive::new(decoder);

        let entries = tar.entries().map_err(ArchiveError::io(archive))?;
        let mut count = 0usize;
        for entry in entries {
            let mut entry = entry.map_err(ArchiveError::io(archive))?;
            let name = entry.path().map_err(ArchiveError::io(archive))?.into_owned();
            checked_relative(&name)?;

            let unpacked = entry.unpack_in(dest).map_err(ArchiveError::io(dest))?;
            if !unpacked {
                return Err(ArchiveError::UnsafePath {
                    path: name.display().to_string(),
                });
            }
            count += 1;
        }

        debug!(archive = %archive.display(), entries = count, "extracted tgz");
        Ok(())
    }

    fn create(&self, source: &Path, archive: &Path) -> ArchiveResult<()> {
        let entries = collect_entries(source)?;
        let out = File::create(archive).map_err(ArchiveError::io(archive))?;

        let encoder = GzBuilder::new()
            .mtime(0)
            .write(BufWriter::new(out), Compression::default());
        let mut tar = Builder::new(encoder);
        tar.mode(tar::HeaderMode::Deterministic);

        for entry in &entries {
            write_entry(&mut tar, entry)?;
        }

        let encoder = tar.into_inner().map_err(ArchiveError::io(archive))?;
        let mut writer = encoder.finish().map_err(ArchiveError::io(archive))?;
        writer.flush().map_err(ArchiveError::io(archive))?;

        debug!(archive = %archive.display(), entries = entries.len(), "wrote tgz");
        Ok(())
    }
}

fn write_entry<T: Write>(tar: &mut Builder<T>, entry: &SourceEntry) -> ArchiveResult<()> {
    let mut header = Header::new_gnu();
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);

    if entry.is_dir {
        header.set_entry_type(EntryType::Directory);
        header.set_mode(0o755);
        header.set_size(0);
        tar.append_data(&mut header, format!("{}/", entry.name), std::io::empty())
            .map_err(ArchiveError::io(&entry.path))?;
    } else {
        let file = File::open(&entry.path).map_err(ArchiveError::io(&entry.path))?;
        let len = file
            .metadata()
            .map_err(ArchiveError::io(&entry.path))?
            .len();
        header.set_entry_type(EntryType::Regular);
        header.set_mode(0o644);
        header.set_size(len);
        tar.append_data(&mut header, &entry.name, BufReader::new(file))
            .map_err(ArchiveError::io(&entry.path))?;
    }
    Ok(())
}
