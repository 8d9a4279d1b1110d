// src/repository/store.rs

//! Repository store: one repository root, its index and its blobs
//!
//! Layout of a root:
//!
//! ```text
//! <root>/repo.db        index
//! <root>/repo.db.gz     sync snapshot
//! <root>/repo.lock      writer lock
//! <root>/pkg/<namespace>/<name>/<version>~<meta_version>/pkg.tgz
//! ```
//!
//! # Commit protocol
//!
//! Writers hold [`RepoLock`] for the whole mutation. The live index is
//! copied to a temp file in the root and modified there inside an SQLite
//! transaction; the blob and the regenerated snapshot are written to temp
//! files as well. Only then are they renamed into place, blob first, then
//! index, then snapshot. Any failure before the renames drops the temp files
//! and leaves the repository exactly as it was.

use crate::db::models::{PackageKey, PackageRecord};
use crate::db::{self, schema};
use crate::error::{Error, Result};
use crate::version::validate_package_name;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::lock::RepoLock;
use super::snapshot::{SNAPSHOT_FILE_NAME, compress_index};

/// Index file name inside a repository root
pub const INDEX_FILE_NAME: &str = "repo.db";

/// Lock file name inside a repository root
pub const LOCK_FILE_NAME: &str = "repo.lock";

/// Directory holding package blobs
pub const PKG_DIR_NAME: &str = "pkg";

/// What to do when the target of a write already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum IfExists {
    /// Report an error
    #[default]
    Fail,
    /// Leave the existing state untouched
    Ignore,
    /// Discard the existing state and write anew
    Replace,
}

/// What to do when the target of a removal is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum IfMissing {
    #[default]
    Fail,
    Ignore,
}

/// Result of a [`RepositoryStore::put`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    Replaced,
    /// A record with the same key existed and policy was `ignore`
    Skipped,
}

/// Handle to an initialized repository root
#[derive(Debug, Clone)]
pub struct RepositoryStore {
    root: PathBuf,
    name: String,
}

impl RepositoryStore {
    /// Create a repository at `root`
    pub fn init(root: &Path, name: &str, if_exists: IfExists) -> Result<Self> {
        validate_package_name(name).map_err(|reason| Error::RepositoryInvalid {
            path: root.to_path_buf(),
            reason: format!("invalid repository name: {reason}"),
        })?;

        fs::create_dir_all(root)?;
        let _lock = RepoLock::acquire(root.join(LOCK_FILE_NAME))?;

        let index_path = root.join(INDEX_FILE_NAME);
        let replacing = index_path.exists();
        if replacing {
            match if_exists {
                IfExists::Fail => return Err(Error::AlreadyInitialized(root.to_path_buf())),
                IfExists::Ignore => {
                    debug!("Repository at {} already exists, leaving it", root.display());
                    return Self::open(root);
                }
                IfExists::Replace => {
                    info!("Replacing repository at {}", root.display());
                }
            }
        }

        let index_tmp = staging_file(root, ".repo.db.")?;
        {
            let conn = Connection::open(index_tmp.path())?;
            schema::create_index(&conn, name)?;
        }
        let snapshot_tmp = compress_index(index_tmp.path(), root)?;
        persist(index_tmp, &index_path)?;
        persist(snapshot_tmp, &root.join(SNAPSHOT_FILE_NAME))?;

        // Old blobs go only once the empty index is live
        let pkg_dir = root.join(PKG_DIR_NAME);
        if replacing && pkg_dir.exists() {
            fs::remove_dir_all(&pkg_dir)?;
        }

        info!("Initialized repository '{}' at {}", name, root.display());
        Ok(Self {
            root: root.to_path_buf(),
            name: name.to_string(),
        })
    }

    /// Open an existing repository, validating its index
    pub fn open(root: &Path) -> Result<Self> {
        let (_conn, info) = db::open_index_read_only(&root.join(INDEX_FILE_NAME))?;
        Ok(Self {
            root: root.to_path_buf(),
            name: info.name,
        })
    }

    /// The repository's self-declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE_NAME)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE_NAME)
    }

    /// Location of a record's archive
    pub fn blob_path(&self, key: &PackageKey) -> PathBuf {
        self.root.join(key.blob_rel_path())
    }

    /// A temp file inside the root, suitable for renaming into place
    pub fn staging_file(&self) -> Result<NamedTempFile> {
        staging_file(&self.root, ".stage.")
    }

    fn read_conn(&self) -> Result<Connection> {
        let (conn, _info) = db::open_index_read_only(&self.index_path())?;
        Ok(conn)
    }

    pub fn get(&self, key: &PackageKey) -> Result<PackageRecord> {
        PackageRecord::find(&self.read_conn()?, key)?
            .ok_or_else(|| Error::PackageNotFound(key.to_string()))
    }

    /// All records with this package name, highest version first
    pub fn find(&self, name: &str) -> Result<Vec<PackageRecord>> {
        PackageRecord::find_by_name(&self.read_conn()?, name)
    }

    pub fn list(&self) -> Result<Vec<PackageRecord>> {
        PackageRecord::list_all(&self.read_conn()?)
    }

    /// Every record that decodes, plus a description of each row that does not
    pub fn list_decodable(&self) -> Result<(Vec<PackageRecord>, Vec<String>)> {
        PackageRecord::list_decodable(&self.read_conn()?)
    }

    /// Store a record and its blob in one commit
    ///
    /// `blob` must come from [`RepositoryStore::staging_file`] so the final
    /// rename stays within one filesystem.
    pub fn put(
        &self,
        mut record: PackageRecord,
        blob: NamedTempFile,
        if_exists: IfExists,
    ) -> Result<PutOutcome> {
        let _lock = RepoLock::acquire(self.root.join(LOCK_FILE_NAME))?;

        let existing = PackageRecord::find(&self.read_conn()?, &record.key)?;
        let outcome = match (existing.is_some(), if_exists) {
            (false, _) => PutOutcome::Inserted,
            (true, IfExists::Fail) => {
                return Err(Error::PackageAlreadyExists(record.key.to_string()));
            }
            (true, IfExists::Ignore) => {
                info!("{} already present, skipping", record.key);
                return Ok(PutOutcome::Skipped);
            }
            (true, IfExists::Replace) => PutOutcome::Replaced,
        };

        record.blob.path = record.key.blob_rel_path();
        let key = record.key.clone();
        let (index_tmp, snapshot_tmp) = self.stage_index(|conn| {
            let tx = conn.transaction()?;
            if outcome == PutOutcome::Replaced {
                PackageRecord::delete(&tx, &key)?;
            }
            record.insert(&tx)?;
            tx.commit()?;
            Ok(())
        })?;

        let blob_dest = self.blob_path(&key);
        if let Some(parent) = blob_dest.parent() {
            fs::create_dir_all(parent)?;
        }
        persist(blob, &blob_dest)?;
        persist(index_tmp, &self.index_path())?;
        persist(snapshot_tmp, &self.snapshot_path())?;

        info!("Committed {} to '{}' ({:?})", key, self.name, outcome);
        Ok(outcome)
    }

    /// Delete a record and its blob in one commit
    ///
    /// Returns whether a record was removed.
    pub fn remove_package(&self, key: &PackageKey, if_missing: IfMissing) -> Result<bool> {
        let _lock = RepoLock::acquire(self.root.join(LOCK_FILE_NAME))?;

        if PackageRecord::find(&self.read_conn()?, key)?.is_none() {
            return match if_missing {
                IfMissing::Fail => Err(Error::PackageNotFound(key.to_string())),
                IfMissing::Ignore => Ok(false),
            };
        }

        let (index_tmp, snapshot_tmp) = self.stage_index(|conn| {
            let tx = conn.transaction()?;
            PackageRecord::delete(&tx, key)?;
            tx.commit()?;
            Ok(())
        })?;
        persist(index_tmp, &self.index_path())?;
        persist(snapshot_tmp, &self.snapshot_path())?;

        let blob = self.blob_path(key);
        if blob.exists() {
            fs::remove_file(&blob)?;
        }
        self.prune_empty_dirs(blob.parent());

        info!("Removed {} from '{}'", key, self.name);
        Ok(true)
    }

    /// Rewrite the snapshot from the current index
    pub fn regenerate_snapshot(&self) -> Result<()> {
        let _lock = RepoLock::acquire(self.root.join(LOCK_FILE_NAME))?;
        let snapshot_tmp = compress_index(&self.index_path(), &self.root)?;
        persist(snapshot_tmp, &self.snapshot_path())
    }

    /// Copy the live index to a temp file, apply `mutate`, and compress the
    /// result into a temp snapshot. Nothing live is touched.
    fn stage_index<F>(&self, mutate: F) -> Result<(NamedTempFile, NamedTempFile)>
    where
        F: FnOnce(&mut Connection) -> Result<()>,
    {
        let index_tmp = staging_file(&self.root, ".repo.db.")?;
        fs::copy(self.index_path(), index_tmp.path())?;
        {
            let mut conn = Connection::open(index_tmp.path())?;
            db::check_index(&conn, index_tmp.path())?;
            mutate(&mut conn)?;
        }
        let snapshot_tmp = compress_index(index_tmp.path(), &self.root)?;
        Ok((index_tmp, snapshot_tmp))
    }

    /// Remove now-empty blob directories up to (not including) `pkg/`
    fn prune_empty_dirs(&self, mut dir: Option<&Path>) {
        let stop = self.root.join(PKG_DIR_NAME);
        while let Some(d) = dir {
            if d == stop || !d.starts_with(&stop) || fs::remove_dir(d).is_err() {
                break;
            }
            dir = d.parent();
        }
    }
}

fn staging_file(dir: &Path, prefix: &str) -> Result<NamedTempFile> {
    Ok(tempfile::Builder::new().prefix(prefix).tempfile_in(dir)?)
}

fn persist(tmp: NamedTempFile, dest: &Path) -> Result<()> {
    tmp.persist(dest).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
