//! zip codec (deflate).

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::error::{ArchiveError, ArchiveResult};
use crate::method::ArchiveMethod;
use crate::walk::{checked_relative, collect_entries};
use crate::ArchiveCodec;

/// Codec for `.zip` bags.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipCodec;

impl ArchiveCodec for ZipCodec {
    fn method(&self) -> ArchiveMethod {
        ArchiveMethod::Zip
    }

    fn extract(&self, archive: &Path, dest: &Path) -> ArchiveResult<()> {
        let file = File::open(archive).map_err(ArchiveError::io(archive))?;
        let mut zip = ZipArchive::new(BufReader::new(file))?;

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            // Some writers use backslashes; normalize before the traversal check.
            let name = entry.name().replace('\\', "/");
            let rel = checked_relative(Path::new(&name))?;
            let out_path = dest.join(&rel);

            if entry.is_dir() {
                fs::create_dir_all(&out_path).map_err(ArchiveError::io(&out_path))?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent).map_err(ArchiveError::io(parent))?;
            }
            let mut out = File::create(&out_path).map_err(ArchiveError::io(&out_path))?;
            io::copy(&mut entry, &mut out).map_err(ArchiveError::io(&out_path))?;
        }

        debug!(archive = %archive.display(), entries = zip.len(), "extracted zip");
        Ok(())
    }

    fn create(&self, source: &Path, archive: &Path) -> ArchiveResult<()> {
        let entries = collect_entries(source)?;
        let out = File::create(archive).map_err(ArchiveError::io(archive))?;
        let mut zip = ZipWriter::new(BufWriter::new(out));

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        for entry in &entries {
            if entry.is_dir {
                zip.add_directory(format!("{}/", entry.name), options.unix_permissions(0o755))?;
            } else {
                zip.start_file(entry.name.as_str(), options.unix_permissions(0o644))?;
                let mut file = File::open(&entry.path).map_err(ArchiveError::io(&entry.path))?;
                io::copy(&mut file, &mut zip).map_err(ArchiveError::io(&entry.path))?;
            }
        }

        let mut writer = zip.finish()?;
        io::Write::flush(&mut writer).map_err(ArchiveError::io(archive))?;

        debug!(archive = %archive.display(), entries = entries.len(), "wrote zip");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn round_trip_preserves_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let bag = tmp.path().join("zipped");
        fs::create_dir_all(bag.join("data/nested")).unwrap();
        fs::write(bag.join("bagit.txt"), "BagIt-Version: 1.0\n").unwrap();
        fs::write(bag.join("data/nested/x.bin"), [0u8, 1, 2, 255]).unwrap();

        let archive = tmp.path().join("zipped.zip");
        ZipCodec.create(&bag, &archive).unwrap();

        let out = tmp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        ZipCodec.extract(&archive, &out).unwrap();

        assert_eq!(
            fs::read(out.join("zipped/data/nested/x.bin")).unwrap(),
            vec![0u8, 1, 2, 255]
        );
        assert!(out.join("zipped/bagit.txt").is_file());
    }

    #[test]
    fn extract_rejects_absolute_and_parent_names() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("evil.zip");
        {
            let mut zip = ZipWriter::new(File::create(&archive).unwrap());
            zip.start_file("../escape.txt", SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"gotcha").unwrap();
            zip.finish().unwrap();
        }

        let out = tmp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let err = ZipCodec.extract(&archive, &out).unwrap_err();
        assert!(err.is_corrupt());
        assert!(!tmp.path().join("escape.txt").exists());
    }

    #[test]
    fn extract_reports_non_zip_as_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("junk.zip");
        fs::write(&archive, b"PK? no").unwrap();
        let out = tmp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let err = ZipCodec.extract(&archive, &out).unwrap_err();
        assert!(matches!(err, ArchiveError::Zip(_)));
    }
}
