//! Prefetch primitive backed by HTTP and the local filesystem
//!
//! `http(s)` URLs are downloaded in full with a GET; `file://` URLs, absolute
//! paths and bundled asset handles are checked on disk.

use crate::config::AppConfig;
use async_trait::async_trait;
use imgcache_core::entry::ImageSource;
use imgcache_core::error::FetchError;
use imgcache_core::prefetch::Prefetcher;
use log::debug;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 200;

#[derive(Error, Debug)]
pub enum PrefetchError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("File not accessible: {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    #[error("Unsupported scheme '{0}'")]
    UnsupportedScheme(String),
}

impl PrefetchError {
    fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated)", &body[..end])
        };
        Self::Status {
            status: status.as_u16(),
            body,
        }
    }
}

/// Where a source resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Http(String),
    File(PathBuf),
}

/// Fetches remote images over HTTP and checks local ones on disk
///
/// Clone is cheap; `reqwest::Client` shares its connection pool.
#[derive(Clone)]
pub struct HttpPrefetcher {
    client: Client,
    assets_dir: Option<PathBuf>,
}

impl HttpPrefetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            assets_dir: None,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let prefetcher = Self::new(
            Duration::from_secs(config.network.timeout_seconds),
            &config.network.user_agent,
        )?;
        Ok(prefetcher.with_assets_dir(config.cache.assets_dir.clone()))
    }

    /// Resolve relative asset handles against `dir`
    pub fn with_assets_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.assets_dir = dir;
        self
    }

    fn resolve(&self, source: &ImageSource<'_>) -> Result<Target, PrefetchError> {
        match source {
            ImageSource::Asset(handle) => {
                let path = Path::new(handle.as_str());
                match (&self.assets_dir, path.is_relative()) {
                    (Some(dir), true) => Ok(Target::File(dir.join(path))),
                    _ => Ok(Target::File(path.to_path_buf())),
                }
            }
            ImageSource::Url(url) => match url.split_once("://") {
                Some((scheme, _)) if scheme.eq_ignore_ascii_case("http") => {
                    Ok(Target::Http(url.to_string()))
                }
                Some((scheme, _)) if scheme.eq_ignore_ascii_case("https") => {
                    Ok(Target::Http(url.to_string()))
                }
                Some(("file", path)) => Ok(Target::File(PathBuf::from(path))),
                Some((scheme, _)) => Err(PrefetchError::UnsupportedScheme(scheme.to_string())),
                None => Ok(Target::File(PathBuf::from(url))),
            },
        }
    }

    async fn fetch_http(&self, url: &str) -> Result<(), PrefetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PrefetchError::from_status(status, &body));
        }

        let bytes = response.bytes().await?;
        debug!("Fetched {} bytes from {url}", bytes.len());
        Ok(())
    }

    async fn check_file(&self, path: &Path) -> Result<(), PrefetchError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| PrefetchError::File {
                path: path.to_path_buf(),
                source,
            })?;
        if !metadata.is_file() {
            return Err(PrefetchError::NotAFile(path.to_path_buf()));
        }
        Ok(())
    }
}

#[async_trait]
impl Prefetcher for HttpPrefetcher {
    async fn prefetch(&self, source: &ImageSource<'_>) -> Result<(), FetchError> {
        let outcome = match self.resolve(source) {
            Ok(Target::Http(url)) => self.fetch_http(&url).await,
            Ok(Target::File(path)) => self.check_file(&path).await,
            Err(e) => Err(e),
        };
        outcome.map_err(|e| FetchError::prefetch(source.id(), e.to_string()))
    }
}
