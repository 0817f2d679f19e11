//! The bag controller.
//!
//! A [`Bag`] ties one directory tree to its manifests, tag manifests,
//! `bag-info.txt` and `fetch.txt`. Construction either opens what is on
//! disk (a directory or an archive) or lays out a new bag. After that the
//! bag is rebuilt with [`Bag::update`] and checked with [`Bag::validate`].

use std::fs;
use std::path::{Path, PathBuf};

use bagit_archive::{codec_for, locate_root, ArchiveCodec, ArchiveMethod};
use tracing::{debug, info, warn};

use crate::bag_info::{BagInfoStore, BagInfoValue, BAG_INFO_FILE};
use crate::config::BagConfig;
use crate::encoding::TagEncoding;
use crate::error::{BagError, BagResult};
use crate::fetch::{FetchList, Fetcher, HttpFetcher, FETCH_FILE};
use crate::files::{list_files, resolve_inside};
use crate::hash::{Algorithm, HashRegistry};
use crate::manifest::{ManifestKind, ManifestRecord, TagManifestRecord};
use crate::marker::{read_marker, write_marker, BagVersion, MARKER_FILE};
use crate::sanitize::sanitize_in_place;
use crate::validation::{ErrorKind, ValidationError};
use crate::workspace::Workspace;

pub const DATA_DIR: &str = "data";

/// Where a bag came from. Resolved once, at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BagOrigin {
    /// An existing bag directory.
    Directory,
    /// An archive, unpacked into a [`Workspace`].
    Archive(ArchiveMethod),
    /// Laid out fresh by [`Bag::create`].
    Created,
}

/// Declaration values, as reported by [`Bag::summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BagSummary {
    pub version: String,
    pub version_parts: BagVersion,
    pub encoding: String,
    /// Comma-joined payload manifest algorithms.
    pub hash: String,
}

#[derive(Debug)]
pub struct Bag {
    root: PathBuf,
    origin: BagOrigin,
    registry: HashRegistry,
    config: BagConfig,
    version: BagVersion,
    encoding: TagEncoding,
    manifests: Vec<ManifestRecord>,
    tag_manifests: Vec<TagManifestRecord>,
    bag_info: Option<BagInfoStore>,
    fetch: Option<FetchList>,
    errors: Vec<ValidationError>,
    workspace: Option<Workspace>,
}

impl Bag {
    /// Open `path` if it is an archive or holds `bagit.txt`, otherwise lay out
    /// a new bag there.
    pub fn new(path: impl AsRef<Path>, config: BagConfig) -> BagResult<Self> {
        Self::with_registry(path, config, HashRegistry::detect())
    }

    /// [`Bag::new`] with an explicit algorithm registry.
    pub fn with_registry(
        path: impl AsRef<Path>,
        config: BagConfig,
        registry: HashRegistry,
    ) -> BagResult<Self> {
        Self::construct(path.as_ref(), config, registry, None)
    }

    /// [`Bag::with_registry`], starting a new bag's metadata from `info`.
    ///
    /// Seeding always turns extended mode on. When `path` already holds a
    /// bag, the `bag-info.txt` on disk is loaded instead of the seed.
    pub fn with_bag_info(
        path: impl AsRef<Path>,
        config: BagConfig,
        registry: HashRegistry,
        info: BagInfoStore,
    ) -> BagResult<Self> {
        Self::construct(path.as_ref(), config.with_extended(true), registry, Some(info))
    }

    fn construct(
        path: &Path,
        config: BagConfig,
        registry: HashRegistry,
        seed: Option<BagInfoStore>,
    ) -> BagResult<Self> {
        let existing = ArchiveMethod::detect(path).is_some() || path.join(MARKER_FILE).is_file();
        if !existing {
            return Self::lay_out(path, config, registry, seed);
        }
        if seed.is_some() {
            warn!(path = %path.display(), "bag exists; keeping its bag-info.txt over the seed");
        }
        Self::open(path, config, registry)
    }

    /// Open an existing bag directory or `.zip` / `.tgz` / `.tar.gz` archive.
    pub fn open(
        path: impl AsRef<Path>,
        config: BagConfig,
        registry: HashRegistry,
    ) -> BagResult<Self> {
        let path = path.as_ref();
        let default_algorithm = registry.resolve(&config.default_algorithm)?;

        let (root, origin, workspace) = match ArchiveMethod::detect(path) {
            Some(method) => {
                let workspace = Workspace::create(&config.temp_prefix)?;
                codec_for(method).extract(path, workspace.path())?;
                let root = locate_root(workspace.path(), MARKER_FILE)?;
                (root, BagOrigin::Archive(method), Some(workspace))
            }
            None if path.is_dir() => (path.to_path_buf(), BagOrigin::Directory, None),
            None => {
                return Err(BagError::InvalidPath {
                    path: path.display().to_string(),
                    reason: "not a bag directory or a recognised archive".to_string(),
                })
            }
        };

        let marker_path = root.join(MARKER_FILE);
        if !marker_path.is_file() {
            write_marker(&marker_path, BagVersion::DEFAULT, &TagEncoding::utf8())?;
        }
        let marker = read_marker(&marker_path)?;

        let mut bag = Self {
            root,
            origin,
            registry,
            version: marker.version,
            encoding: marker.encoding,
            manifests: Vec::new(),
            tag_manifests: Vec::new(),
            bag_info: None,
            fetch: None,
            errors: marker.errors,
            workspace,
            config,
        };

        bag.manifests = bag.discover(ManifestKind::Payload)?;
        if bag.manifests.is_empty() {
            let record = bag.open_record(ManifestKind::Payload, default_algorithm)?;
            bag.manifests.push(record);
        }

        if bag.config.extended {
            bag.tag_manifests = bag.discover(ManifestKind::Tag)?;
            bag.reconcile_algorithms()?;

            match FetchList::open(&bag.root, bag.encoding.clone()) {
                Ok(fetch) => bag.fetch = Some(fetch),
                Err(e) => {
                    warn!(error = %e, "could not read fetch file");
                    bag.errors.push(ValidationError::new(
                        ErrorKind::Fetch,
                        "fetch",
                        "Error reading fetch file.",
                    ));
                }
            }

            match BagInfoStore::load(&bag.root.join(BAG_INFO_FILE), &bag.encoding) {
                Ok(store) => bag.bag_info = Some(store),
                Err(e) => {
                    warn!(error = %e, "could not read bag-info");
                    bag.errors.push(ValidationError::new(
                        ErrorKind::Metadata,
                        "baginfo",
                        "Error reading bag info file.",
                    ));
                }
            }
        }

        info!(
            root = %bag.root.display(),
            origin = ?bag.origin,
            algorithms = %bag.algorithm_list(),
            "opened bag"
        );
        bag.after_construct()?;
        Ok(bag)
    }

    /// Lay out a new bag at `path`: the directory, `data/`, `bagit.txt` and
    /// one manifest for the default algorithm.
    pub fn create(
        path: impl AsRef<Path>,
        config: BagConfig,
        registry: HashRegistry,
    ) -> BagResult<Self> {
        Self::lay_out(path.as_ref(), config, registry, None)
    }

    fn lay_out(
        path: &Path,
        config: BagConfig,
        registry: HashRegistry,
        seed: Option<BagInfoStore>,
    ) -> BagResult<Self> {
        let root = path.to_path_buf();
        let default_algorithm = registry.resolve(&config.default_algorithm)?;

        let data = root.join(DATA_DIR);
        fs::create_dir_all(&data).map_err(BagError::io(&data))?;

        let version = BagVersion::DEFAULT;
        let encoding = TagEncoding::utf8();
        write_marker(&root.join(MARKER_FILE), version, &encoding)?;

        let mut bag = Self {
            root,
            origin: BagOrigin::Created,
            registry,
            version,
            encoding,
            manifests: Vec::new(),
            tag_manifests: Vec::new(),
            bag_info: None,
            fetch: None,
            errors: Vec::new(),
            workspace: None,
            config,
        };
        let record = bag.open_record(ManifestKind::Payload, default_algorithm)?;
        bag.manifests.push(record);

        if bag.config.extended {
            let record = bag.open_record(ManifestKind::Tag, default_algorithm)?;
            bag.tag_manifests.push(record);
            bag.fetch = Some(FetchList::open(&bag.root, bag.encoding.clone())?);

            let info_path = bag.root.join(BAG_INFO_FILE);
            if !info_path.exists() {
                fs::write(&info_path, b"").map_err(BagError::io(&info_path))?;
            }
            bag.bag_info = Some(seed.unwrap_or_default());
        }

        info!(root = %bag.root.display(), algorithm = %default_algorithm, "created bag");
        bag.after_construct()?;
        Ok(bag)
    }

    fn after_construct(&mut self) -> BagResult<()> {
        if self.config.fetch_on_open && self.fetch.as_ref().is_some_and(|f| !f.is_empty()) {
            self.download()?;
        }
        if self.config.validate_on_open {
            self.validate();
        }
        Ok(())
    }

    fn open_record(&self, kind: ManifestKind, algorithm: Algorithm) -> BagResult<ManifestRecord> {
        ManifestRecord::open(kind, algorithm, &self.root, self.encoding.clone())
    }

    /// Manifests of `kind` present in the bag root, in file-name order.
    fn discover(&mut self, kind: ManifestKind) -> BagResult<Vec<ManifestRecord>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(BagError::io(&self.root))? {
            let entry = entry.map_err(BagError::io(&self.root))?;
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        let mut records = Vec::new();
        for name in names {
            let Some(algorithm) = kind.algorithm_in(&name) else {
                continue;
            };
            match self.registry.resolve(algorithm) {
                Ok(algorithm) => records.push(self.open_record(kind, algorithm)?),
                Err(e) => {
                    warn!(file = %name, error = %e, "ignoring manifest");
                    self.errors.push(ValidationError::new(
                        ErrorKind::Structural,
                        kind.prefix(),
                        format!("Error reading {name}."),
                    ));
                }
            }
        }
        Ok(records)
    }

    /// Give every payload algorithm a tag manifest and every tag algorithm a
    /// payload manifest.
    fn reconcile_algorithms(&mut self) -> BagResult<()> {
        let payload: Vec<Algorithm> = self
            .manifests
            .iter()
            .map(ManifestRecord::algorithm)
            .collect();
        let tag: Vec<Algorithm> = self
            .tag_manifests
            .iter()
            .map(ManifestRecord::algorithm)
            .collect();

        for algorithm in payload.iter().filter(|a| !tag.contains(a)) {
            let record = self.open_record(ManifestKind::Tag, *algorithm)?;
            self.tag_manifests.push(record);
        }
        for algorithm in tag.iter().filter(|a| !payload.contains(a)) {
            let record = self.open_record(ManifestKind::Payload, *algorithm)?;
            self.manifests.push(record);
        }
        Ok(())
    }

    // Rebuild and validation

    /// Recompute every manifest from what is on disk.
    ///
    /// Payload file names are sanitized first. Tag manifests are computed
    /// after the payload manifests have been rewritten, so they cover the
    /// fresh manifest bytes.
    pub fn update(&mut self) -> BagResult<()> {
        for manifest in &mut self.manifests {
            manifest.clear()?;
        }
        for manifest in &mut self.tag_manifests {
            manifest.clear()?;
        }

        let data = self.data_directory();
        for file in list_files(&data)? {
            sanitize_in_place(&file)?;
        }

        let has_info = self.bag_info.as_ref().is_some_and(|b| !b.is_empty());
        if self.config.extended || has_info {
            let info_path = self.root.join(BAG_INFO_FILE);
            self.bag_info
                .get_or_insert_with(BagInfoStore::new)
                .write(&info_path, &self.encoding)?;
        }

        let payload = list_files(&data)?;
        for manifest in &mut self.manifests {
            manifest.update(&payload)?;
        }

        let tag_files = self.tag_files();
        for manifest in &mut self.tag_manifests {
            manifest.update(&tag_files)?;
        }

        info!(
            root = %self.root.display(),
            payload_files = payload.len(),
            algorithms = %self.algorithm_list(),
            "bag updated"
        );
        Ok(())
    }

    fn tag_files(&self) -> Vec<PathBuf> {
        let mut files = vec![
            self.root.join(MARKER_FILE),
            self.root.join(BAG_INFO_FILE),
            self.root.join(FETCH_FILE),
        ];
        files.extend(self.manifest_file_names());
        files
    }

    /// Check the bag and replace the stored error list with what was found.
    pub fn validate(&mut self) -> &[ValidationError] {
        let mut errors = Vec::new();

        let marker_path = self.root.join(MARKER_FILE);
        if marker_path.is_file() {
            match read_marker(&marker_path) {
                Ok(marker) => errors.extend(marker.errors),
                Err(e) => errors.push(ValidationError::new(
                    ErrorKind::Marker,
                    "bagit",
                    format!("Error reading bagit.txt: {e}"),
                )),
            }
        } else {
            errors.push(missing(MARKER_FILE));
        }

        if !self.data_directory().is_dir() {
            errors.push(missing(DATA_DIR));
        }

        for manifest in &mut self.manifests {
            if manifest.file_path().is_file() {
                if let Err(e) = manifest.read() {
                    errors.push(ValidationError::new(
                        ErrorKind::Structural,
                        manifest.file_name(),
                        format!("Error reading {}: {e}", manifest.file_name()),
                    ));
                    continue;
                }
            }
            manifest.validate(&mut errors);
        }

        let location = format!("{}/{}", self.root.display(), BAG_INFO_FILE);
        self.bag_info
            .get_or_insert_with(BagInfoStore::new)
            .validate_non_repeatable(&location, &mut errors);

        if errors.is_empty() {
            info!(root = %self.root.display(), "bag is valid");
        } else {
            warn!(root = %self.root.display(), errors = errors.len(), "bag is not valid");
        }
        self.errors = errors;
        &self.errors
    }

    /// True when the last validation found nothing.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Recorded errors, validating first when `validate` is set.
    pub fn bag_errors(&mut self, validate: bool) -> &[ValidationError] {
        if validate {
            self.validate();
        }
        &self.errors
    }

    // Hash algorithm lifecycle

    pub fn hash_encodings(&self) -> Vec<Algorithm> {
        self.manifests.iter().map(ManifestRecord::algorithm).collect()
    }

    /// The first payload manifest algorithm.
    pub fn hash_encoding(&self) -> Option<Algorithm> {
        self.manifests.first().map(ManifestRecord::algorithm)
    }

    pub fn has_hash_encoding(&self, name: &str) -> bool {
        Algorithm::from_name(name).is_some_and(|a| self.has_algorithm(a))
    }

    fn has_algorithm(&self, algorithm: Algorithm) -> bool {
        self.manifests.iter().any(|m| m.algorithm() == algorithm)
    }

    pub fn is_supported_hash(&self, name: &str) -> bool {
        self.registry.is_supported(name)
    }

    /// Add a payload manifest (and, when extended, a tag manifest) for `name`.
    pub fn add_hash_encoding(&mut self, name: &str) -> BagResult<()> {
        let algorithm = self.registry.resolve(name)?;
        if self.has_algorithm(algorithm) {
            return Ok(());
        }

        let payload = self.open_record(ManifestKind::Payload, algorithm)?;
        if self.config.extended {
            match self.open_record(ManifestKind::Tag, algorithm) {
                Ok(tag) => self.tag_manifests.push(tag),
                Err(e) => {
                    payload.remove_file()?;
                    return Err(e);
                }
            }
        }
        self.manifests.push(payload);

        debug!(algorithm = %algorithm, "added hash encoding");
        Ok(())
    }

    /// Drop `name` and delete its manifest files. Unknown or absent names are ignored.
    pub fn remove_hash_encoding(&mut self, name: &str) -> BagResult<()> {
        let Some(algorithm) = Algorithm::from_name(name).filter(|a| self.has_algorithm(*a)) else {
            return Ok(());
        };
        if self.manifests.len() == 1 {
            return Err(BagError::LastAlgorithmRemoval {
                algorithm: algorithm.to_string(),
            });
        }
        self.drop_algorithm(algorithm)
    }

    /// Make `name` the only algorithm: add it, then remove every other one.
    pub fn set_hash_encoding(&mut self, name: &str) -> BagResult<()> {
        self.add_hash_encoding(name)?;
        let keep = self.registry.resolve(name)?;
        let others: Vec<Algorithm> = self
            .hash_encodings()
            .into_iter()
            .filter(|a| *a != keep)
            .collect();
        for algorithm in others {
            self.drop_algorithm(algorithm)?;
        }
        Ok(())
    }

    fn drop_algorithm(&mut self, algorithm: Algorithm) -> BagResult<()> {
        if let Some(i) = self.manifests.iter().position(|m| m.algorithm() == algorithm) {
            self.manifests.remove(i).remove_file()?;
        }
        if let Some(i) = self.tag_manifests.iter().position(|m| m.algorithm() == algorithm) {
            self.tag_manifests.remove(i).remove_file()?;
        }
        debug!(algorithm = %algorithm, "removed hash encoding");
        Ok(())
    }

    // Payload files

    /// Copy `src` into the payload at `dest` (prefixed with `data/` if needed).
    pub fn add_file(&self, src: impl AsRef<Path>, dest: &str) -> BagResult<PathBuf> {
        let src = src.as_ref();
        if !src.is_file() {
            return Err(BagError::MissingSource {
                path: src.to_path_buf(),
            });
        }
        let target = self.payload_target(dest)?;
        ensure_parent(&target)?;
        fs::copy(src, &target).map_err(BagError::io(&target))?;
        debug!(src = %src.display(), dest = %target.display(), "added payload file");
        Ok(target)
    }

    /// Write `content` to a new payload file at `dest` (prefixed with `data/` if needed).
    pub fn create_file(&self, content: impl AsRef<[u8]>, dest: &str) -> BagResult<PathBuf> {
        let target = self.payload_target(dest)?;
        if target.exists() {
            return Err(BagError::FileExists { path: target });
        }
        ensure_parent(&target)?;
        fs::write(&target, content).map_err(BagError::io(&target))?;
        Ok(target)
    }

    fn payload_target(&self, dest: &str) -> BagResult<PathBuf> {
        let dest = dest.replace('\\', "/");
        let has_prefix = dest
            .get(..DATA_DIR.len() + 1)
            .is_some_and(|p| p.eq_ignore_ascii_case("data/"));
        let rel = if has_prefix {
            dest
        } else {
            format!("{DATA_DIR}/{dest}")
        };
        resolve_inside(&self.root, &rel)
    }

    /// Every payload file, recursively.
    pub fn bag_contents(&self) -> BagResult<Vec<PathBuf>> {
        list_files(&self.data_directory())
    }

    // Fetch

    /// Download fetch entries over HTTP(S). Transfer failures are appended
    /// to the error list; returns how many files were written.
    pub fn download(&mut self) -> BagResult<usize> {
        let fetcher = HttpFetcher::from_config(&self.config)?;
        Ok(self.download_with(&fetcher))
    }

    pub fn download_with(&mut self, fetcher: &dyn Fetcher) -> usize {
        match &self.fetch {
            Some(fetch) => fetch.download(fetcher, &mut self.errors),
            None => 0,
        }
    }

    pub fn fetch(&self) -> Option<&FetchList> {
        self.fetch.as_ref()
    }

    pub fn fetch_mut(&mut self) -> Option<&mut FetchList> {
        self.fetch.as_mut()
    }

    // Packaging

    /// Write the bag to `destination` as `method` (`"tgz"` or `"zip"`).
    ///
    /// The method's extension is appended when `destination` lacks it.
    /// Returns the archive path.
    pub fn package(&self, destination: impl AsRef<Path>, method: &str) -> BagResult<PathBuf> {
        let method = ArchiveMethod::parse(method)?;
        self.package_with(codec_for(method).as_ref(), destination)
    }

    pub fn package_with(
        &self,
        codec: &dyn ArchiveCodec,
        destination: impl AsRef<Path>,
    ) -> BagResult<PathBuf> {
        let method = codec.method();
        let mut destination = destination.as_ref().to_path_buf();
        if !method.matches_extension(&destination) {
            let mut name = destination.into_os_string();
            name.push(".");
            name.push(method.extension());
            destination = PathBuf::from(name);
        }
        if destination.is_dir() {
            return Err(BagError::Packaging {
                message: format!("destination {} is a directory", destination.display()),
            });
        }

        codec.create(&self.root, &destination)?;
        info!(archive = %destination.display(), method = %method, "packaged bag");
        Ok(destination)
    }

    // Metadata

    pub fn bag_info(&self) -> Option<&BagInfoStore> {
        self.bag_info.as_ref()
    }

    pub fn bag_info_mut(&mut self) -> &mut BagInfoStore {
        self.bag_info.get_or_insert_with(BagInfoStore::new)
    }

    pub fn get_bag_info_data(&self, key: &str) -> Option<&BagInfoValue> {
        self.bag_info.as_ref()?.get(key)
    }

    pub fn set_bag_info_data(&mut self, key: &str, value: impl Into<String>) -> BagResult<()> {
        self.bag_info_mut().set_value(key, value)
    }

    pub fn has_bag_info_data(&self, key: &str, case_insensitive: bool) -> bool {
        self.bag_info
            .as_ref()
            .is_some_and(|b| b.has_key(key, case_insensitive))
    }

    pub fn clear_bag_info_data(&mut self, key: &str) -> Option<BagInfoValue> {
        self.bag_info_mut().remove(key)
    }

    pub fn clear_all_bag_info(&mut self) {
        self.bag_info_mut().clear();
    }

    pub fn bag_info_keys(&self) -> Vec<&str> {
        self.bag_info
            .as_ref()
            .map(|b| b.keys().collect())
            .unwrap_or_default()
    }

    // Accessors

    pub fn summary(&self) -> BagSummary {
        BagSummary {
            version: self.version.to_string(),
            version_parts: self.version,
            encoding: self.encoding.label().to_string(),
            hash: self.algorithm_list(),
        }
    }

    fn algorithm_list(&self) -> String {
        self.manifests
            .iter()
            .map(|m| m.algorithm().canonical_name())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn bag_directory(&self) -> &Path {
        &self.root
    }

    pub fn data_directory(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn origin(&self) -> BagOrigin {
        self.origin
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.origin, BagOrigin::Archive(_))
    }

    pub fn compression(&self) -> Option<ArchiveMethod> {
        match self.origin {
            BagOrigin::Archive(method) => Some(method),
            _ => None,
        }
    }

    pub fn is_extended(&self) -> bool {
        self.config.extended
    }

    pub fn version(&self) -> BagVersion {
        self.version
    }

    pub fn tag_file_encoding(&self) -> &TagEncoding {
        &self.encoding
    }

    pub fn manifests(&self) -> &[ManifestRecord] {
        &self.manifests
    }

    pub fn tag_manifests(&self) -> &[TagManifestRecord] {
        &self.tag_manifests
    }

    /// Paths of the payload manifest files.
    pub fn manifest_file_names(&self) -> Vec<PathBuf> {
        self.manifests
            .iter()
            .map(|m| m.file_path().to_path_buf())
            .collect()
    }

    pub fn config(&self) -> &BagConfig {
        &self.config
    }

    pub fn registry(&self) -> &HashRegistry {
        &self.registry
    }

    /// The scratch directory behind an archive-backed bag.
    pub fn workspace(&self) -> Option<&Workspace> {
        self.workspace.as_ref()
    }

    /// Hand the scratch directory to the caller. The bag keeps working on it,
    /// but it is no longer removed when the bag is dropped.
    pub fn detach_workspace(&mut self) -> Option<Workspace> {
        self.workspace.take()
    }
}

fn missing(name: &str) -> ValidationError {
    ValidationError::new(ErrorKind::Structural, name, format!("{name} does not exist."))
}

fn ensure_parent(path: &Path) -> BagResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(BagError::io(parent))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_bag(dir: &Path) -> Bag {
        Bag::new(dir.join("bag"), BagConfig::default()).unwrap()
    }

    #[test]
    fn create_lays_out_extended_bag() {
        let tmp = tempfile::tempdir().unwrap();
        let bag = new_bag(tmp.path());
        let root = bag.bag_directory();

        assert_eq!(bag.origin(), BagOrigin::Created);
        assert!(root.join("data").is_dir());
        assert!(root.join("manifest-sha512.txt").is_file());
        assert!(root.join("tagmanifest-sha512.txt").is_file());
        assert!(root.join("bag-info.txt").is_file());
        assert!(!root.join("fetch.txt").exists());
        assert_eq!(
            fs::read_to_string(root.join("bagit.txt")).unwrap(),
            "BagIt-Version: 1.0\nTag-File-Character-Encoding: UTF-8\n"
        );
    }

    #[test]
    fn non_extended_create_has_no_tag_files() {
        let tmp = tempfile::tempdir().unwrap();
        let config = BagConfig::default().with_extended(false);
        let bag = Bag::new(tmp.path().join("plain"), config).unwrap();
        assert!(bag.tag_manifests().is_empty());
        assert!(bag.fetch().is_none());
        assert!(!bag.bag_directory().join("bag-info.txt").exists());
    }

    #[test]
    fn unsupported_default_algorithm_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let config = BagConfig::default().with_default_algorithm("sha256");
        let registry = HashRegistry::with_available([Algorithm::Md5]);
        let err = Bag::with_registry(tmp.path().join("bag"), config, registry).unwrap_err();
        assert!(matches!(err, BagError::UnsupportedAlgorithm { .. }));
    }

    #[test]
    fn open_reconciles_tag_and_payload_algorithms() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("bag");
        fs::create_dir_all(root.join("data")).unwrap();
        fs::write(root.join("manifest-md5.txt"), "").unwrap();
        fs::write(root.join("tagmanifest-sha1.txt"), "").unwrap();

        let bag = Bag::open(&root, BagConfig::default(), HashRegistry::detect()).unwrap();
        assert_eq!(bag.origin(), BagOrigin::Directory);
        assert_eq!(bag.hash_encodings(), vec![Algorithm::Md5, Algorithm::Sha1]);
        let mut tags: Vec<_> = bag.tag_manifests().iter().map(|m| m.algorithm()).collect();
        tags.sort();
        assert_eq!(tags, vec![Algorithm::Md5, Algorithm::Sha1]);
        // Marker was missing, so the default one was written.
        assert!(root.join("bagit.txt").is_file());
    }

    #[test]
    fn open_records_unsupported_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("bag");
        fs::create_dir_all(root.join("data")).unwrap();
        fs::write(root.join("manifest-whirlpool.txt"), "").unwrap();

        let config = BagConfig::default().with_extended(false);
        let bag = Bag::open(&root, config, HashRegistry::detect()).unwrap();
        assert_eq!(bag.hash_encodings(), vec![Algorithm::Sha512]);
        assert_eq!(
            bag.errors()[0].as_pair(),
            ("manifest", "Error reading manifest-whirlpool.txt.")
        );
    }

    #[test]
    fn directory_without_marker_is_laid_out() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("loose");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("notes.txt"), "n").unwrap();

        let bag = Bag::new(&root, BagConfig::default()).unwrap();
        assert_eq!(bag.origin(), BagOrigin::Created);
        assert!(root.join("bagit.txt").is_file());
        assert!(root.join("data").is_dir());
        assert!(root.join("notes.txt").is_file());

        let reopened = Bag::new(&root, BagConfig::default()).unwrap();
        assert_eq!(reopened.origin(), BagOrigin::Directory);
    }

    #[test]
    fn bag_info_seed_turns_on_extended_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let mut info = BagInfoStore::new();
        info.set_value("source-organization", "University of Virginia")
            .unwrap();
        info.set_value("contact-name", "Someone").unwrap();

        let config = BagConfig::default().with_extended(false);
        let bag =
            Bag::with_bag_info(tmp.path().join("bag"), config, HashRegistry::detect(), info)
                .unwrap();

        assert!(bag.is_extended());
        assert_eq!(bag.tag_manifests().len(), 1);
        assert!(bag.has_bag_info_data("source-organization", false));
        assert!(bag.has_bag_info_data("contact-name", false));
        assert!(!bag.has_bag_info_data("bag-date", false));
        assert_eq!(bag.bag_info_keys(), vec!["source-organization", "contact-name"]);
    }

    #[test]
    fn bag_info_seed_does_not_replace_existing_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        bag.set_bag_info_data("Contact-Name", "Ann").unwrap();
        bag.update().unwrap();

        let mut info = BagInfoStore::new();
        info.set_value("Contact-Name", "Seeded").unwrap();
        let reopened = Bag::with_bag_info(
            bag.bag_directory(),
            BagConfig::default(),
            HashRegistry::detect(),
            info,
        )
        .unwrap();
        assert_eq!(
            reopened.get_bag_info_data("Contact-Name").and_then(BagInfoValue::first),
            Some("Ann")
        );
    }

    #[test]
    fn payload_target_prefixes_and_confines() {
        let tmp = tempfile::tempdir().unwrap();
        let bag = new_bag(tmp.path());
        assert_eq!(
            bag.payload_target("a/b.txt").unwrap(),
            bag.bag_directory().join("data/a/b.txt")
        );
        assert_eq!(
            bag.payload_target("DATA/x.txt").unwrap(),
            bag.bag_directory().join("DATA/x.txt")
        );
        assert!(bag.payload_target("../../etc/passwd").is_err());
    }

    #[test]
    fn create_file_refuses_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let bag = new_bag(tmp.path());
        bag.create_file("one", "note.txt").unwrap();
        let err = bag.create_file("two", "data/note.txt").unwrap_err();
        assert!(matches!(err, BagError::FileExists { .. }));
        assert_eq!(
            fs::read_to_string(bag.data_directory().join("note.txt")).unwrap(),
            "one"
        );
    }

    #[test]
    fn add_hash_encoding_rejects_unknown_without_change() {
        let tmp = tempfile::tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        let err = bag.add_hash_encoding("crc32").unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(bag.hash_encodings(), vec![Algorithm::Sha512]);
    }

    #[test]
    fn summary_reports_declaration() {
        let tmp = tempfile::tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        bag.add_hash_encoding("md5").unwrap();
        let summary = bag.summary();
        assert_eq!(summary.version, "1.0");
        assert_eq!(summary.version_parts, BagVersion::new(1, 0));
        assert_eq!(summary.encoding, "UTF-8");
        assert_eq!(summary.hash, "sha512,md5");
    }

    #[test]
    fn package_appends_extension_and_rejects_unknown_method() {
        let tmp = tempfile::tempdir().unwrap();
        let bag = new_bag(tmp.path());

        let out = bag.package(tmp.path().join("out"), "zip").unwrap();
        assert_eq!(out, tmp.path().join("out.zip"));
        assert!(out.is_file());

        let out = bag.package(tmp.path().join("again.tar.gz"), "TGZ").unwrap();
        assert_eq!(out, tmp.path().join("again.tar.gz"));

        let err = bag.package(tmp.path().join("x"), "rar").unwrap_err();
        assert!(err.is_packaging());
        assert!(!tmp.path().join("x.rar").exists());
    }
}
