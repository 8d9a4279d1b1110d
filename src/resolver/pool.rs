// src/resolver/pool.rs

//! Candidate pool: every usable package version, grouped by name

use crate::catalog::{Catalog, CatalogPackage};
use crate::error::Result;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Anything that can list package records for resolution
pub trait PackageSource {
    /// Records tagged with their repository, in repository priority order
    fn packages(&self) -> Result<Vec<CatalogPackage>>;
}

impl PackageSource for Catalog {
    fn packages(&self) -> Result<Vec<CatalogPackage>> {
        Catalog::packages(self)
    }
}

impl PackageSource for [CatalogPackage] {
    fn packages(&self) -> Result<Vec<CatalogPackage>> {
        Ok(self.to_vec())
    }
}

impl PackageSource for Vec<CatalogPackage> {
    fn packages(&self) -> Result<Vec<CatalogPackage>> {
        Ok(self.clone())
    }
}

/// Usable candidates per package name, highest (version, meta_version) first
#[derive(Debug, Default)]
pub struct CandidatePool {
    by_name: BTreeMap<String, Vec<CatalogPackage>>,
}

impl CandidatePool {
    /// Build the pool from a source
    ///
    /// Records with `meta_version < 1`, in either the index column or the
    /// stored manifest, are never candidates. When several repositories
    /// serve the same `(name, version, meta_version)` the first one wins.
    pub fn build<S: PackageSource + ?Sized>(source: &S) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut by_name: BTreeMap<String, Vec<CatalogPackage>> = BTreeMap::new();

        for pkg in source.packages()? {
            let key = &pkg.record.key;
            if key.meta_version < 1 || pkg.record.manifest.meta_version < 1 {
                warn!(
                    "Ignoring {} from '{}': meta_version must be at least 1",
                    key, pkg.repo
                );
                continue;
            }
            if !seen.insert((key.name.clone(), key.version.clone(), key.meta_version)) {
                debug!("{} from '{}' shadowed by an earlier repository", key, pkg.repo);
                continue;
            }
            by_name.entry(key.name.clone()).or_default().push(pkg);
        }

        for candidates in by_name.values_mut() {
            // Stable, so equal keys keep catalog order
            candidates.sort_by(|a, b| {
                (&b.record.key.version, b.record.key.meta_version)
                    .cmp(&(&a.record.key.version, a.record.key.meta_version))
            });
        }

        Ok(Self { by_name })
    }

    /// Candidates for a name, best first; empty if there are none
    pub fn candidates(&self, name: &str) -> &[CatalogPackage] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
