//! Options for opening and creating bags.

use serde::{Deserialize, Serialize};

/// Bag construction options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagConfig {
    /// Maintain tag manifests, `bag-info.txt` and `fetch.txt`.
    #[serde(default = "default_extended")]
    pub extended: bool,

    /// Run `validate()` right after construction.
    #[serde(default)]
    pub validate_on_open: bool,

    /// Download fetch entries right after construction.
    #[serde(default)]
    pub fetch_on_open: bool,

    /// Algorithm for the first manifest of a new bag, or of a bag without one.
    #[serde(default = "default_algorithm")]
    pub default_algorithm: String,

    /// Per-request timeout for fetch downloads, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Prefix for the temporary directory an archive is unpacked into.
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,
}

fn default_extended() -> bool {
    true
}

fn default_algorithm() -> String {
    crate::hash::DEFAULT_ALGORITHM.canonical_name().to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_temp_prefix() -> String {
    "bag".to_string()
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

impl Default for BagConfig {
    fn default() -> Self {
        Self {
            extended: default_extended(),
            validate_on_open: false,
            fetch_on_open: false,
            default_algorithm: default_algorithm(),
            fetch_timeout_secs: default_fetch_timeout(),
            temp_prefix: default_temp_prefix(),
        }
    }
}

impl BagConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `BAGIT_EXTENDED` | Maintain tag manifests and metadata (default on) |
    /// | `BAGIT_VALIDATE_ON_OPEN` | Validate after construction |
    /// | `BAGIT_FETCH_ON_OPEN` | Download fetch entries after construction |
    /// | `BAGIT_DEFAULT_ALGORITHM` | Default manifest algorithm |
    /// | `BAGIT_FETCH_TIMEOUT` | Fetch timeout in seconds |
    /// | `BAGIT_TEMP_PREFIX` | Temporary directory prefix |
    pub fn from_env() -> Self {
        Self {
            extended: env_flag("BAGIT_EXTENDED", default_extended()),
            validate_on_open: env_flag("BAGIT_VALIDATE_ON_OPEN", false),
            fetch_on_open: env_flag("BAGIT_FETCH_ON_OPEN", false),
            default_algorithm: std::env::var("BAGIT_DEFAULT_ALGORITHM")
                .unwrap_or_else(|_| default_algorithm()),
            fetch_timeout_secs: std::env::var("BAGIT_FETCH_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_fetch_timeout),
            temp_prefix: std::env::var("BAGIT_TEMP_PREFIX")
                .unwrap_or_else(|_| default_temp_prefix()),
        }
    }

    pub fn with_extended(mut self, extended: bool) -> Self {
        self.extended = extended;
        self
    }

    pub fn with_validate_on_open(mut self, validate: bool) -> Self {
        self.validate_on_open = validate;
        self
    }

    pub fn with_fetch_on_open(mut self, fetch: bool) -> Self {
        self.fetch_on_open = fetch;
        self
    }

    /// Set the default manifest algorithm.
    pub fn with_default_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.default_algorithm = algorithm.into();
        self
    }

    pub fn with_fetch_timeout(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    pub fn with_temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.temp_prefix = prefix.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_format_defaults() {
        let config = BagConfig::default();
        assert!(config.extended);
        assert!(!config.validate_on_open);
        assert_eq!(config.default_algorithm, "sha512");
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.temp_prefix, "bag");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: BagConfig =
            serde_json::from_str(r#"{"extended": false, "default_algorithm": "md5"}"#).unwrap();
        assert!(!config.extended);
        assert_eq!(config.default_algorithm, "md5");
        assert_eq!(config.fetch_timeout_secs, 30);
    }

    #[test]
    fn builders_chain() {
        let config = BagConfig::default()
            .with_extended(false)
            .with_validate_on_open(true)
            .with_fetch_on_open(true)
            .with_fetch_timeout(5)
            .with_temp_prefix("unpack");
        assert!(!config.extended);
        assert!(config.validate_on_open);
        assert!(config.fetch_on_open);
        assert_eq!(config.fetch_timeout_secs, 5);
        assert_eq!(config.temp_prefix, "unpack");
    }
}
