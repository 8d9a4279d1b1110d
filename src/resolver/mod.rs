// src/resolver/mod.rs

//! Dependency resolution
//!
//! Turns requirement strings such as `bar@4.1.3` into a [`ResolvedSet`]:
//! exactly one package version per required name, drawn from the
//! repositories of a [`PackageSource`] (normally the catalog).
//!
//! Resolution is deterministic: names are settled in lexical order and the
//! highest acceptable (version, meta_version) is always tried first. Either
//! a complete set is produced or [`Error::NoSolution`] is returned; there
//! are no partial results.

mod conflict;
mod pool;
mod solver;

pub use conflict::Conflict;
pub use pool::{CandidatePool, PackageSource};
pub use solver::{ROOT_REQUIRER, Solver};

use crate::catalog::CatalogPackage;
use crate::error::{Error, Result};
use crate::version::DependencyRequirement;
use std::collections::BTreeMap;
use tracing::info;

/// One chosen package per name, ordered by name
#[derive(Debug, Clone, Default)]
pub struct ResolvedSet {
    packages: BTreeMap<String, CatalogPackage>,
}

impl ResolvedSet {
    pub fn get(&self, name: &str) -> Option<&CatalogPackage> {
        self.packages.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CatalogPackage)> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn into_packages(self) -> Vec<CatalogPackage> {
        self.packages.into_values().collect()
    }
}

/// Resolve parsed requirements against a source
pub fn resolve<S: PackageSource + ?Sized>(
    source: &S,
    requirements: &[DependencyRequirement],
) -> Result<ResolvedSet> {
    let pool = CandidatePool::build(source)?;
    let chosen = Solver::new(&pool)
        .solve(requirements)
        .map_err(|conflict| Error::NoSolution(conflict.to_string()))?;

    let set = ResolvedSet {
        packages: chosen
            .into_iter()
            .map(|(name, pkg)| (name, pkg.clone()))
            .collect(),
    };
    info!("Resolved {} packages", set.len());
    Ok(set)
}

/// Parse requirement strings and resolve them
pub fn resolve_strings<S, R>(source: &S, requirements: &[R]) -> Result<ResolvedSet>
where
    S: PackageSource + ?Sized,
    R: AsRef<str>,
{
    let reqs = requirements
        .iter()
        .map(|r| DependencyRequirement::parse(r.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    resolve(source, &reqs)
}
