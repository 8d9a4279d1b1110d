// src/config.rs
//! Client configuration
//!
//! Read from TOML, by default `<config dir>/pkgindex/config.toml`:
//!
//! ```toml
//! cache_dir = "/home/me/.cache/pkgindex"
//! repo_sync_mode = "cached-okay"
//! use_default_repos = ["https://repo.example.com/main"]
//!
//! [http]
//! timeout_secs = 30
//! max_retries = 3
//! ```
//!
//! Precedence, highest first: command-line flags, the `PKGINDEX_CACHE_DIR`
//! environment variable (cache directory only), the file, built-in defaults.

use crate::catalog::SyncMode;
use crate::error::{Error, Result};
use crate::repository::RepositoryClient;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding the cache directory
pub const CACHE_DIR_ENV: &str = "PKGINDEX_CACHE_DIR";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Catalog, snapshot and package cache location
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpSection,

    /// Default snapshot sync behavior for `--use-repo` locations
    #[serde(default)]
    pub repo_sync_mode: SyncMode,

    /// Repository locations used when none are given on the command line
    #[serde(default)]
    pub use_default_repos: Vec<String>,
}

/// HTTP configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSection {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per request before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Config {
    /// Parse configuration text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration from a file that must exist
    pub fn load_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Load the explicit file if given, else the default file if present,
    /// else defaults; then apply the environment override
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::load_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from));
        Ok(config)
    }

    /// Apply the value of `PKGINDEX_CACHE_DIR`, if set and non-empty
    pub fn apply_env(&mut self, cache_dir: Option<PathBuf>) {
        if let Some(dir) = cache_dir.filter(|d| !d.as_os_str().is_empty()) {
            debug!("Cache directory from {}: {}", CACHE_DIR_ENV, dir.display());
            self.cache_dir = Some(dir);
        }
    }

    /// `<config dir>/pkgindex/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("pkgindex").join("config.toml"))
    }

    /// The configured cache directory, or the platform default
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::cache_dir().map(|d| d.join("pkgindex")).ok_or_else(|| {
                Error::Config("no cache directory could be determined; set cache_dir".to_string())
            }),
        }
    }

    /// HTTP client built from the `[http]` section
    pub fn client(&self) -> Result<RepositoryClient> {
        RepositoryClient::with_settings(
            Duration::from_secs(self.http.timeout_secs),
            self.http.max_retries,
        )
    }
}
