// src/catalog/mod.rs

//! Client-side catalog of repositories
//!
//! The catalog lives in the cache directory:
//!
//! ```text
//! <cache>/catalog.db                      name -> location, insertion order
//! <cache>/repos/<name>/repo.db            cached snapshot per repository
//! <cache>/pkgs/<name>@<version>~<meta>/   expanded, prefetched packages
//! ```
//!
//! Repositories are keyed by the name they declare in their own index, not
//! by the location they were added from. A failed sync never touches the
//! existing cached snapshot or the catalog row.

mod fetch;

use crate::db::models::{CatalogRepo, PackageRecord};
use crate::db::{self, IndexInfo};
use crate::error::{Error, Result};
use crate::repository::snapshot::CACHED_INDEX_FILE_NAME;
use crate::repository::{Location, RepositoryClient, SNAPSHOT_FILE_NAME, install_snapshot};
use crate::version::validate_package_name;
use rayon::prelude::*;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Catalog database file name inside the cache directory
pub const CATALOG_FILE_NAME: &str = "catalog.db";

/// Directory of cached snapshots
pub const REPOS_DIR_NAME: &str = "repos";

/// Directory of prefetched packages
pub const PKGS_DIR_NAME: &str = "pkgs";

/// When to re-fetch a repository's snapshot before using it
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Always fetch a fresh snapshot
    Always,
    /// Use a cached snapshot if there is one, fetch otherwise
    #[default]
    CachedOkay,
    /// Never fetch; a cached snapshot must exist
    Never,
}

impl FromStr for SyncMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "always" => Ok(SyncMode::Always),
            "cached-okay" => Ok(SyncMode::CachedOkay),
            "never" => Ok(SyncMode::Never),
            _ => Err(Error::Config(format!(
                "invalid sync mode '{s}' (expected always, cached-okay or never)"
            ))),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncMode::Always => "always",
            SyncMode::CachedOkay => "cached-okay",
            SyncMode::Never => "never",
        })
    }
}

/// A package record together with the catalog repository serving it
#[derive(Debug, Clone)]
pub struct CatalogPackage {
    pub repo: String,
    pub record: PackageRecord,
}

/// Client-local registry of repositories and their cached snapshots
pub struct Catalog {
    cache_dir: PathBuf,
    conn: Connection,
    client: RepositoryClient,
}

impl Catalog {
    /// Open (creating if needed) the catalog in `cache_dir`
    pub fn open(cache_dir: &Path) -> Result<Self> {
        Self::open_with_client(cache_dir, RepositoryClient::new()?)
    }

    pub fn open_with_client(cache_dir: &Path, client: RepositoryClient) -> Result<Self> {
        fs::create_dir_all(cache_dir)?;
        let conn = db::open_catalog(&cache_dir.join(CATALOG_FILE_NAME))?;
        debug!("Opened catalog in {}", cache_dir.display());
        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
            conn,
            client,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn repos_dir(&self) -> PathBuf {
        self.cache_dir.join(REPOS_DIR_NAME)
    }

    fn pkgs_dir(&self) -> PathBuf {
        self.cache_dir.join(PKGS_DIR_NAME)
    }

    /// Path of the cached snapshot for a repository name
    pub fn cached_index_path(&self, name: &str) -> PathBuf {
        self.repos_dir().join(name).join(CACHED_INDEX_FILE_NAME)
    }

    /// Fetch a repository's snapshot and register it under its declared name
    ///
    /// Re-adding a name refreshes both its location and its snapshot.
    pub fn add(&self, location: &str) -> Result<CatalogRepo> {
        let location = Location::parse(location)?.to_string();
        let info = sync_snapshot(&self.client, &location, &self.repos_dir(), None)?;

        let mut repo = CatalogRepo::new(info.name, location);
        repo.last_sync = Some(chrono::Utc::now().to_rfc3339());
        repo.upsert(&self.conn)?;

        info!("Added repository '{}' ({})", repo.name, repo.location);
        Ok(repo)
    }

    /// Forget a repository and its cached snapshot
    pub fn remove(&self, name: &str) -> Result<()> {
        // Only valid names were ever cataloged, and the name becomes a path
        if validate_package_name(name).is_err() || !CatalogRepo::delete(&self.conn, name)? {
            return Err(Error::NoSuchRepository(name.to_string()));
        }

        let dir = self.repos_dir().join(name);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        info!("Removed repository '{}'", name);
        Ok(())
    }

    /// Entries in insertion order
    pub fn list(&self) -> Result<Vec<CatalogRepo>> {
        CatalogRepo::list_all(&self.conn)
    }

    /// Re-sync every repository concurrently
    ///
    /// Returns one result per repository; a failure leaves that
    /// repository's previous snapshot in place.
    pub fn update(&self) -> Result<Vec<(String, Result<IndexInfo>)>> {
        let repos = self.list()?;
        let repos_dir = self.repos_dir();
        let client = &self.client;

        let results: Vec<(String, Result<IndexInfo>)> = repos
            .par_iter()
            .map(|repo| {
                let result = sync_snapshot(client, &repo.location, &repos_dir, Some(&repo.name));
                (repo.name.clone(), result)
            })
            .collect();

        let now = chrono::Utc::now().to_rfc3339();
        for (name, result) in &results {
            match result {
                Ok(_) => CatalogRepo::set_last_sync(&self.conn, name, &now)?,
                Err(e) => warn!("Failed to sync '{}': {}", name, e),
            }
        }
        Ok(results)
    }

    /// Make sure the repository at `location` is cataloged, syncing per `mode`
    pub fn ensure(&self, location: &str, mode: SyncMode) -> Result<CatalogRepo> {
        let normalized = Location::parse(location)?.to_string();
        let existing = CatalogRepo::find_by_location(&self.conn, &normalized)?
            .filter(|repo| self.cached_index_path(&repo.name).is_file());

        match (mode, existing) {
            (SyncMode::Always, _) => self.add(location),
            (SyncMode::CachedOkay, Some(repo)) | (SyncMode::Never, Some(repo)) => {
                debug!("Using cached snapshot of '{}'", repo.name);
                Ok(repo)
            }
            (SyncMode::CachedOkay, None) => self.add(location),
            (SyncMode::Never, None) => Err(Error::SyncNotFound(format!(
                "{normalized} has no cached snapshot and sync mode is 'never'"
            ))),
        }
    }

    /// Every cached record, tagged with its repository, in catalog order
    pub fn packages(&self) -> Result<Vec<CatalogPackage>> {
        let mut packages = Vec::new();
        for repo in self.list()? {
            let index = self.cached_index_path(&repo.name);
            if !index.is_file() {
                warn!("No cached snapshot for '{}', skipping", repo.name);
                continue;
            }
            let (conn, _info) = db::open_index_read_only(&index)?;
            let (records, undecodable) = PackageRecord::list_decodable(&conn)?;
            for problem in undecodable {
                warn!("Skipping unreadable record in '{}': {}", repo.name, problem);
            }
            for record in records {
                packages.push(CatalogPackage {
                    repo: repo.name.clone(),
                    record,
                });
            }
        }
        Ok(packages)
    }
}

/// Fetch `<location>/repo.db.gz` and install it into `repos_dir`
///
/// With `expected`, a snapshot declaring any other name is rejected.
fn sync_snapshot(
    client: &RepositoryClient,
    location: &str,
    repos_dir: &Path,
    expected: Option<&str>,
) -> Result<IndexInfo> {
    let snapshot = Location::parse(location)?.join(SNAPSHOT_FILE_NAME)?;
    info!("Syncing {}", snapshot);

    let bytes = client
        .fetch_bytes(&snapshot)?
        .ok_or_else(|| Error::SyncNotFound(snapshot.to_string()))?;
    install_snapshot(&bytes, location, repos_dir, expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{IfExists, RepositoryStore};
    use tempfile::TempDir;

    #[test]
    fn test_add_list_remove() {
        let tmp = TempDir::new().unwrap();
        let repo_dir = tmp.path().join("repo");
        RepositoryStore::init(&repo_dir, "upstream", IfExists::Fail).unwrap();

        let catalog = Catalog::open(&tmp.path().join("cache")).unwrap();
        let repo = catalog.add(repo_dir.to_str().unwrap()).unwrap();
        assert_eq!(repo.name, "upstream");
        assert!(catalog.cached_index_path("upstream").is_file());
        assert_eq!(catalog.list().unwrap().len(), 1);

        catalog.remove("upstream").unwrap();
        assert!(!catalog.cached_index_path("upstream").exists());
        let err = catalog.remove("upstream").unwrap_err();
        assert_eq!(err.id(), "no-such-repository");
    }

    #[test]
    fn test_add_missing_snapshot() {
        let tmp = TempDir::new().unwrap();
        let catalog = Catalog::open(&tmp.path().join("cache")).unwrap();
        let err = catalog.add(tmp.path().to_str().unwrap()).unwrap_err();
        assert_eq!(err.id(), "sync-not-found");
        assert!(catalog.list().unwrap().is_empty());
    }

    #[test]
    fn test_ensure_never_without_cache() {
        let tmp = TempDir::new().unwrap();
        let repo_dir = tmp.path().join("repo");
        RepositoryStore::init(&repo_dir, "upstream", IfExists::Fail).unwrap();
        let catalog = Catalog::open(&tmp.path().join("cache")).unwrap();
        let loc = repo_dir.to_str().unwrap();

        assert_eq!(
            catalog.ensure(loc, SyncMode::Never).unwrap_err().id(),
            "sync-not-found"
        );
        catalog.ensure(loc, SyncMode::CachedOkay).unwrap();
        assert_eq!(catalog.ensure(loc, SyncMode::Never).unwrap().name, "upstream");
    }

    #[test]
    fn test_remove_rejects_path_like_names() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let catalog = Catalog::open(&cache).unwrap();
        fs::create_dir_all(cache.join(REPOS_DIR_NAME)).unwrap();

        for name in ["..", ".", "../cache"] {
            let err = catalog.remove(name).unwrap_err();
            assert_eq!(err.id(), "no-such-repository");
        }
        assert!(cache.join(CATALOG_FILE_NAME).is_file());
        assert!(cache.join(REPOS_DIR_NAME).is_dir());
    }

    #[test]
    fn test_sync_mode_parse() {
        assert_eq!("cached-okay".parse::<SyncMode>().unwrap(), SyncMode::CachedOkay);
        assert!("sometimes".parse::<SyncMode>().is_err());
    }
}
