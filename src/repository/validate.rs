// src/repository/validate.rs

//! Repository-wide health check
//!
//! Import already validates each package on the way in; this pass re-checks
//! what is actually stored, which catches indexes edited by hand or written
//! by other tools.

use crate::db::models::{PackageKey, PackageRecord};
use crate::error::{Error, Result};
use crate::hash::sha256_file;
use tracing::{debug, warn};

use super::store::RepositoryStore;

/// Every problem found in one repository
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub checked: usize,
    pub problems: Vec<Error>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }

    /// The number of checked records, or the first problem found
    pub fn into_result(self) -> Result<usize> {
        match self.problems.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.checked),
        }
    }
}

/// Check every record in the repository
pub fn validate_repository(store: &RepositoryStore) -> Result<ValidationReport> {
    let (records, undecodable) = store.list_decodable()?;
    let mut report = ValidationReport {
        checked: records.len() + undecodable.len(),
        problems: Vec::new(),
    };

    for problem in undecodable {
        report.problems.push(Error::RepositoryInvalid {
            path: store.index_path(),
            reason: format!("unreadable record, {problem}"),
        });
    }

    for record in &records {
        check_record(store, record, &mut report.problems);
    }

    for problem in &report.problems {
        warn!("{}: {}", store.name(), problem);
    }
    debug!(
        "Validated {} records in '{}', {} problems",
        report.checked,
        store.name(),
        report.problems.len()
    );
    Ok(report)
}

fn check_record(store: &RepositoryStore, record: &PackageRecord, problems: &mut Vec<Error>) {
    let key = &record.key;
    let manifest = &record.manifest;

    if key.meta_version < 1 || manifest.meta_version < 1 {
        problems.push(Error::InvalidMetaVersion {
            source_path: key.to_string(),
            reason: format!(
                "stored meta_version {} (manifest says {}) must be at least 1",
                key.meta_version, manifest.meta_version
            ),
        });
    }

    let declared = PackageKey::from_manifest(manifest);
    if declared != *key {
        problems.push(Error::ManifestShape {
            source_path: key.to_string(),
            reason: format!("stored manifest identifies itself as {declared}"),
        });
    }

    if let Err(e) = manifest.check_references() {
        problems.push(e.into_error(&key.to_string()));
    }

    let blob = store.blob_path(key);
    match sha256_file(&blob) {
        Ok(digest) if !digest.hex.eq_ignore_ascii_case(&record.blob.sha256) => {
            problems.push(Error::ChecksumMismatch {
                package: key.to_string(),
                expected: record.blob.sha256.clone(),
                actual: digest.hex,
            });
        }
        Ok(_) => {}
        Err(e) => problems.push(Error::RepositoryInvalid {
            path: blob,
            reason: format!("blob for {key} is unreadable: {e}"),
        }),
    }
}
