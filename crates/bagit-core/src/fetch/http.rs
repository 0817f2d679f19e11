//! Blocking HTTP(S) transport for fetch entries.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use tracing::debug;
use url::Url;

use super::{FetchError, Fetcher};
use crate::config::BagConfig;

/// User agent for fetch requests.
pub const USER_AGENT_VALUE: &str = concat!("bagit-core/", env!("CARGO_PKG_VERSION"));

/// [`Fetcher`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT_VALUE)
            .build()
            .map_err(|e| FetchError::Http {
                url: String::new(),
                message: format!("failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    pub fn from_config(config: &BagConfig) -> Result<Self, FetchError> {
        Self::new(Duration::from_secs(config.fetch_timeout_secs))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        debug!(url = %parsed, dest = %dest.display(), "fetching");
        let mut response = self
            .client
            .get(parsed)
            .send()
            .map_err(|e| FetchError::Http {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let file = File::create(dest).map_err(|source| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        let bytes = response.copy_to(&mut writer).map_err(|e| FetchError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        writer.flush().map_err(|source| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        Ok(bytes)
    }
}
