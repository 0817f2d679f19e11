//! BagIt bags: create, open, update and validate.
//!
//! ```no_run
//! use bagit_core::{Bag, BagConfig};
//!
//! let mut bag = Bag::new("/tmp/my-bag", BagConfig::default())?;
//! bag.create_file("hello", "greeting.txt")?;
//! bag.update()?;
//! assert!(bag.validate().is_empty());
//! bag.package("/tmp/my-bag", "tgz")?;
//! # Ok::<(), bagit_core::BagError>(())
//! ```

pub mod bag;
pub mod bag_info;
pub mod config;
pub mod encoding;
pub mod error;
pub mod fetch;
pub mod files;
pub mod hash;
pub mod manifest;
pub mod marker;
pub mod sanitize;
pub mod validation;
pub mod workspace;

// Convenience re-exports
pub use bag::{Bag, BagOrigin, BagSummary, DATA_DIR};
pub use bag_info::{BagInfoStore, BagInfoValue, NON_REPEATABLE, RESERVED_ELEMENTS};
pub use config::BagConfig;
pub use encoding::TagEncoding;
pub use error::{BagError, BagResult};
pub use fetch::{FetchEntry, FetchError, FetchList, Fetcher, HttpFetcher};
pub use hash::{Algorithm, HashRegistry, DEFAULT_ALGORITHM};
pub use manifest::{ManifestKind, ManifestRecord, TagManifestRecord};
pub use marker::BagVersion;
pub use sanitize::sanitize_file_name;
pub use validation::{ErrorKind, ValidationError};
pub use workspace::Workspace;

// Archive collaborator, for callers that package with a custom codec.
pub use bagit_archive::{ArchiveCodec, ArchiveMethod};
