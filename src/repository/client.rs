// src/repository/client.rs

//! Location-addressed transport for snapshots and package blobs
//!
//! A repository is reachable either on the local filesystem (a plain path
//! or a `file://` URL) or over HTTP(S). Both kinds report a missing
//! resource as `Ok(None)` so callers can tell "not there" apart from
//! "there but broken".

use crate::error::{Error, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default timeout for HTTP requests (30 seconds)
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default retry attempts for failed requests
pub const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 250;

/// Where a repository (or one of its files) lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Remote(Url),
}

fn parse_url(input: &str) -> Result<Url> {
    Url::parse(input).map_err(|e| Error::Config(format!("invalid URL '{input}': {e}")))
}

impl Location {
    /// Interpret a user-supplied path or URL
    pub fn parse(input: &str) -> Result<Self> {
        let lower = input.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = parse_url(input)?;
            return Ok(Location::Remote(url));
        }
        if lower.starts_with("file://") {
            let url = parse_url(input)?;
            let path = url
                .to_file_path()
                .map_err(|_| Error::Config(format!("'{input}' is not a local file URL")))?;
            return Ok(Location::Local(path));
        }
        let path = Path::new(input);
        Ok(Location::Local(std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())))
    }

    /// A file below this location
    pub fn join(&self, rel: &str) -> Result<Location> {
        match self {
            Location::Local(dir) => Ok(Location::Local(dir.join(rel))),
            Location::Remote(url) => {
                let mut base = url.clone();
                if !base.path().ends_with('/') {
                    let path = format!("{}/", base.path());
                    base.set_path(&path);
                }
                let joined = base
                    .join(rel)
                    .map_err(|e| Error::Config(format!("cannot join '{rel}' onto {url}: {e}")))?;
                Ok(Location::Remote(joined))
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Remote(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Remote(url) => write!(f, "{url}"),
        }
    }
}

/// Blocking fetcher with retry support for remote locations
#[derive(Clone)]
pub struct RepositoryClient {
    client: Client,
    max_retries: u32,
}

impl RepositoryClient {
    /// Create a client with default timeout and retries
    pub fn new() -> Result<Self> {
        Self::with_settings(HTTP_TIMEOUT, MAX_RETRIES)
    }

    pub fn with_settings(timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pkgindex/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: max_retries.max(1),
        })
    }

    /// Fetch a whole resource into memory; `None` when it does not exist
    pub fn fetch_bytes(&self, location: &Location) -> Result<Option<Vec<u8>>> {
        match location {
            Location::Local(path) => match fs::read(path) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
            Location::Remote(url) => {
                let Some(response) = self.get(url)? else {
                    return Ok(None);
                };
                let bytes = response.bytes().map_err(|e| {
                    Error::DownloadError(format!("Failed to read response from {url}: {e}"))
                })?;
                debug!("Fetched {} bytes from {}", bytes.len(), url);
                Ok(Some(bytes.to_vec()))
            }
        }
    }

    /// Download a resource to `dest` through a temp file in the same
    /// directory; `false` when it does not exist
    pub fn download_file(&self, location: &Location, dest: &Path) -> Result<bool> {
        let parent = dest.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(parent)?;
        let mut tmp = tempfile::Builder::new().prefix(".download.").tempfile_in(parent)?;

        match location {
            Location::Local(path) => {
                let mut src = match File::open(path) {
                    Ok(f) => f,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
                    Err(e) => return Err(e.into()),
                };
                io::copy(&mut src, &mut tmp)?;
            }
            Location::Remote(url) => {
                let Some(mut response) = self.get(url)? else {
                    return Ok(false);
                };
                io::copy(&mut response, &mut tmp)
                    .map_err(|e| Error::DownloadError(format!("Failed to download {url}: {e}")))?;
            }
        }

        tmp.flush()?;
        tmp.persist(dest).map_err(|e| Error::Io(e.error))?;
        info!("Downloaded {} to {}", location, dest.display());
        Ok(true)
    }

    /// GET with retries on transport failure; 404 maps to `None`
    fn get(&self, url: &Url) -> Result<Option<reqwest::blocking::Response>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url.clone()).send() {
                Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                    debug!("{} returned 404", url);
                    return Ok(None);
                }
                Ok(response) if !response.status().is_success() => {
                    return Err(Error::DownloadError(format!(
                        "HTTP {} from {}",
                        response.status(),
                        url
                    )));
                }
                Ok(response) => return Ok(Some(response)),
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::DownloadError(format!(
                            "Failed to fetch {url} after {attempt} attempts: {e}"
                        )));
                    }
                    warn!("Fetch attempt {} for {} failed: {}, retrying...", attempt, url, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }
}
