// src/catalog/fetch.rs

//! Package prefetch and retrieval from cataloged repositories

use crate::db::models::{CatalogRepo, PackageId, PackageRecord};
use crate::error::{Error, Result};
use crate::hash::verify_file_sha256;
use crate::repository::blob::unpack_archive;
use crate::repository::{Location, RepositoryClient};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{Catalog, CatalogPackage};

/// One blob to bring into the package cache
struct FetchTask {
    id: String,
    blob: Location,
    sha256: String,
    dest: PathBuf,
}

impl Catalog {
    /// Find the record an id selects, first repository in catalog order wins
    ///
    /// An id without `~meta` selects the highest meta_version of the first
    /// repository that has the version at all.
    pub fn find_package(&self, id: &PackageId) -> Result<CatalogPackage> {
        let mut best: Option<CatalogPackage> = None;
        for pkg in self.packages()? {
            if !id.matches(&pkg.record.key) {
                continue;
            }
            match &best {
                Some(b) if b.repo != pkg.repo => break,
                Some(b) if b.record.key.meta_version >= pkg.record.key.meta_version => {}
                _ => best = Some(pkg),
            }
        }
        best.ok_or_else(|| Error::PackageNotFound(id.to_string()))
    }

    /// Directory a package is expanded into inside the cache
    pub fn cached_package_dir(&self, record: &PackageRecord) -> PathBuf {
        self.pkgs_dir().join(record.key.package_id().to_string())
    }

    /// Download and expand packages into the cache, concurrently
    ///
    /// Already-cached packages are not fetched again. Returns the expanded
    /// directory of each id, in input order.
    pub fn prefetch(&self, ids: &[PackageId]) -> Result<Vec<PathBuf>> {
        let mut tasks = Vec::with_capacity(ids.len());
        for id in ids {
            let pkg = self.find_package(id)?;
            let repo = CatalogRepo::find_by_name(&self.conn, &pkg.repo)?
                .ok_or_else(|| Error::NoSuchRepository(pkg.repo.clone()))?;
            if !is_relative_blob_path(&pkg.record.blob.path) {
                return Err(Error::SnapshotInvalid {
                    location: repo.location,
                    reason: format!(
                        "{} has blob path '{}' outside the repository",
                        pkg.record.key, pkg.record.blob.path
                    ),
                });
            }
            tasks.push(FetchTask {
                id: pkg.record.key.package_id().to_string(),
                blob: Location::parse(&repo.location)?.join(&pkg.record.blob.path)?,
                sha256: pkg.record.blob.sha256.clone(),
                dest: self.cached_package_dir(&pkg.record),
            });
        }

        let pkgs_dir = self.pkgs_dir();
        fs::create_dir_all(&pkgs_dir)?;
        let client = &self.client;

        tasks
            .par_iter()
            .map(|task| fetch_package(client, task, &pkgs_dir))
            .collect()
    }

    /// Expand a package into `<dest>/<name>@<version>`, replacing any
    /// previous copy there
    pub fn get(&self, id: &PackageId, dest: &Path) -> Result<PathBuf> {
        let cached = self
            .prefetch(std::slice::from_ref(id))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::PackageNotFound(id.to_string()))?;

        let out = dest.join(format!("{}@{}", id.name, id.version));
        if out.exists() {
            fs::remove_dir_all(&out)?;
        }
        copy_tree(&cached, &out)?;
        info!("Wrote {} to {}", id, out.display());
        Ok(out)
    }
}

/// A blob path must stay below the repository root
fn is_relative_blob_path(path: &str) -> bool {
    !path.is_empty()
        && !path.contains('\\')
        && path
            .split('/')
            .all(|c| !c.is_empty() && c != "." && c != ".." && !c.contains(':'))
}

fn fetch_package(client: &RepositoryClient, task: &FetchTask, pkgs_dir: &Path) -> Result<PathBuf> {
    if task.dest.is_dir() {
        debug!("{} already in package cache", task.id);
        return Ok(task.dest.clone());
    }

    let scratch = tempfile::Builder::new()
        .prefix(".fetch.")
        .tempdir_in(pkgs_dir)?;
    let archive = scratch.path().join("pkg.tgz");
    if !client.download_file(&task.blob, &archive)? {
        return Err(Error::PackageNotFound(format!(
            "{} (blob missing at {})",
            task.id, task.blob
        )));
    }
    if task.sha256.is_empty() {
        debug!("No digest recorded for {}, skipping verification", task.id);
    } else {
        verify_file_sha256(&archive, &task.sha256, &task.id)?;
    }

    let tree = scratch.path().join("tree");
    unpack_archive(&archive, &tree).map_err(|e| Error::SourceStorage {
        source_path: task.blob.to_string(),
        reason: e.to_string(),
    })?;

    match fs::rename(&tree, &task.dest) {
        Ok(()) => {}
        // Another fetch of the same package finished first
        Err(_) if task.dest.is_dir() => {}
        Err(e) => return Err(e.into()),
    }
    info!("Prefetched {}", task.id);
    Ok(task.dest.clone())
}

fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e)))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
