// src/commands/repo.rs
//! Repository management commands

use anyhow::Result;
use pkgindex::db::models::PackageId;
use pkgindex::repository::{PutOutcome, import_packages, validate_repository};
use pkgindex::{IfExists, IfMissing, RepositoryStore};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Create a repository
pub fn cmd_repo_init(dir: &Path, name: &str, if_exists: IfExists) -> Result<()> {
    info!("Initializing repository '{}' at {}", name, dir.display());
    let store = RepositoryStore::init(dir, name, if_exists)?;
    println!("Repository '{}' at {}", store.name(), store.root().display());
    Ok(())
}

/// Import package sources, then check the whole repository
pub fn cmd_repo_import(
    dir: &Path,
    sources: &[PathBuf],
    if_exists: IfExists,
    no_validate: bool,
) -> Result<()> {
    let store = RepositoryStore::open(dir)?;
    let outcomes = import_packages(&store, sources, if_exists)?;
    for outcome in &outcomes {
        let verb = match outcome.outcome {
            PutOutcome::Inserted => "Imported",
            PutOutcome::Replaced => "Replaced",
            PutOutcome::Skipped => "Skipped existing",
        };
        println!("{} {}", verb, outcome.key);
    }

    if !no_validate {
        validate_repository(&store)?.into_result()?;
    }
    Ok(())
}

/// Check every package in a repository
pub fn cmd_repo_validate(dir: &Path) -> Result<()> {
    let store = RepositoryStore::open(dir)?;
    let report = validate_repository(&store)?;
    for problem in &report.problems {
        warn!("{}", problem);
        eprintln!("  [{}] {}", problem.id(), problem);
    }
    let checked = report.into_result()?;
    println!("Repository '{}': {} packages OK", store.name(), checked);
    Ok(())
}

/// List packages
pub fn cmd_repo_ls(dir: &Path) -> Result<()> {
    let store = RepositoryStore::open(dir)?;
    let records = store.list()?;
    if records.is_empty() {
        println!("Repository '{}' is empty", store.name());
        return Ok(());
    }
    for record in records {
        println!("{}", record.key.package_id());
    }
    Ok(())
}

/// Remove packages by id
///
/// Ids without a `~meta_version` remove every meta version of that
/// package version.
pub fn cmd_repo_remove_packages(dir: &Path, ids: &[String], if_missing: IfMissing) -> Result<()> {
    let store = RepositoryStore::open(dir)?;
    let records = store.list()?;

    for raw in ids {
        let id = PackageId::parse(raw)?;
        let keys: Vec<_> = records
            .iter()
            .filter(|r| id.matches(&r.key))
            .map(|r| r.key.clone())
            .collect();

        if keys.is_empty() {
            match if_missing {
                IfMissing::Fail => {
                    return Err(pkgindex::Error::PackageNotFound(id.to_string()).into());
                }
                IfMissing::Ignore => {
                    info!("{} is not in the repository, ignoring", id);
                    continue;
                }
            }
        }
        for key in keys {
            if store.remove_package(&key, if_missing)? {
                println!("Removed {}", key);
            }
        }
    }
    Ok(())
}
