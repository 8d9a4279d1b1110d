// src/repository/import.rs

//! Import pipeline: admit untrusted packages into a repository
//!
//! A source is either a directory with `pkg.json` at its top, or a
//! `.tgz`/`.tar.gz` archive with `pkg.json` at its root. Loading a source
//! parses and validates the manifest ([`StagedPackage::load`]); committing
//! it re-archives the tree as the package blob and writes the record
//! ([`StagedPackage::commit`]). Nothing touches the repository until every
//! check has passed.

use crate::db::models::{BlobRef, PackageKey, PackageRecord};
use crate::error::{Error, Result};
use crate::hash::sha256_file;
use crate::manifest::{MANIFEST_FILE_NAME, PackageManifest};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

use super::blob::{is_archive_path, pack_tree, unpack_archive};
use super::store::{IfExists, PutOutcome, RepositoryStore};

/// Package tree backing a staged import
#[derive(Debug)]
enum PackageTree {
    /// A directory source, used in place
    Directory(PathBuf),
    /// An archive source, expanded into a scratch directory
    Extracted(TempDir),
}

impl PackageTree {
    fn path(&self) -> &Path {
        match self {
            PackageTree::Directory(p) => p,
            PackageTree::Extracted(dir) => dir.path(),
        }
    }
}

/// A package whose manifest has been parsed and validated
#[derive(Debug)]
pub struct StagedPackage {
    pub manifest: PackageManifest,
    source: String,
    tree: PackageTree,
}

/// What an import did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub key: PackageKey,
    pub outcome: PutOutcome,
}

impl StagedPackage {
    /// Locate, read and validate a package source
    pub fn load(source: &Path) -> Result<Self> {
        let source_display = source.display().to_string();
        let storage_err = |e: io::Error| Error::SourceStorage {
            source_path: source_display.clone(),
            reason: e.to_string(),
        };

        let tree = if source.is_dir() {
            PackageTree::Directory(source.to_path_buf())
        } else if source.is_file() {
            if !is_archive_path(source) {
                return Err(Error::SourceStorage {
                    source_path: source_display,
                    reason: "not a package directory or .tgz archive".to_string(),
                });
            }
            let scratch = TempDir::new()?;
            unpack_archive(source, scratch.path()).map_err(storage_err)?;
            PackageTree::Extracted(scratch)
        } else {
            return Err(Error::SourceNotFound(source_display));
        };

        let manifest_path = tree.path().join(MANIFEST_FILE_NAME);
        if !manifest_path.is_file() {
            return Err(Error::SourceNotFound(format!(
                "{source_display} (no {MANIFEST_FILE_NAME})"
            )));
        }
        let text = fs::read(&manifest_path).map_err(storage_err)?;
        let text = String::from_utf8(text).map_err(|e| Error::ManifestEncoding {
            source_path: source_display.clone(),
            reason: e.to_string(),
        })?;

        let manifest = PackageManifest::parse(&text).map_err(|e| e.into_error(&source_display))?;
        debug!("Validated manifest for {} from {}", manifest, source_display);

        Ok(Self {
            manifest,
            source: source_display,
            tree,
        })
    }

    pub fn key(&self) -> PackageKey {
        PackageKey::from_manifest(&self.manifest)
    }

    /// Archive the tree as the package blob and commit the record
    pub fn commit(self, store: &RepositoryStore, if_exists: IfExists) -> Result<ImportOutcome> {
        let key = self.key();

        let mut blob = store.staging_file()?;
        pack_tree(self.tree.path(), blob.as_file()).map_err(|e| Error::SourceStorage {
            source_path: self.source.clone(),
            reason: e.to_string(),
        })?;
        blob.flush()?;
        blob.as_file().sync_all()?;

        let digest = sha256_file(blob.path())?;
        let record = PackageRecord::new(
            self.manifest,
            BlobRef {
                path: key.blob_rel_path(),
                sha256: digest.hex,
                size: digest.size as i64,
            },
        );

        let outcome = store.put(record, blob, if_exists)?;
        Ok(ImportOutcome { key, outcome })
    }
}

/// Validate and commit one package source
pub fn import_package(
    store: &RepositoryStore,
    source: &Path,
    if_exists: IfExists,
) -> Result<ImportOutcome> {
    StagedPackage::load(source)?.commit(store, if_exists)
}

/// Import sources in order, stopping at the first failure
///
/// Each source is its own commit, so packages imported before a failing
/// one stay in the repository.
pub fn import_packages<P: AsRef<Path>>(
    store: &RepositoryStore,
    sources: &[P],
    if_exists: IfExists,
) -> Result<Vec<ImportOutcome>> {
    let mut outcomes = Vec::with_capacity(sources.len());
    for source in sources {
        let outcome = import_package(store, source.as_ref(), if_exists)?;
        info!("Imported {} ({:?})", outcome.key, outcome.outcome);
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
