// src/commands/package.rs
//! Package consumer commands: catalog, search, solve and fetch

use anyhow::Result;
use pkgindex::db::models::PackageId;
use pkgindex::{Catalog, resolve_strings, search};
use std::path::Path;
use tracing::info;

use super::CatalogOptions;

/// Add a repository to the catalog
pub fn cmd_repo_add(opts: &CatalogOptions, location: &str) -> Result<()> {
    let catalog = opts.open()?;
    let repo = catalog.add(location)?;
    println!("Added repository: {}", repo.name);
    println!("  Location: {}", repo.location);
    Ok(())
}

/// Remove repositories from the catalog
pub fn cmd_repo_remove(opts: &CatalogOptions, names: &[String]) -> Result<()> {
    let catalog = opts.open()?;
    for name in names {
        catalog.remove(name)?;
        println!("Removed repository: {}", name);
    }
    Ok(())
}

/// List cataloged repositories
pub fn cmd_repo_list(opts: &CatalogOptions) -> Result<()> {
    let catalog = opts.open()?;
    let repos = catalog.list()?;
    if repos.is_empty() {
        println!("No repositories configured");
        return Ok(());
    }

    println!("Repositories:");
    for repo in repos {
        let sync_status = repo
            .last_sync
            .as_ref()
            .map(|ts| format!("synced {}", ts))
            .unwrap_or_else(|| "never synced".to_string());
        println!("  {} ({})", repo.name, sync_status);
        println!("      {}", repo.location);
    }
    Ok(())
}

/// Re-sync every cataloged repository
///
/// Every repository is attempted; the command fails with the first error
/// after all of them have been tried.
pub fn cmd_repo_update(opts: &CatalogOptions) -> Result<()> {
    let catalog = opts.open()?;
    let mut first_error = None;
    for (name, result) in catalog.update()? {
        match result {
            Ok(_) => println!("Updated {}", name),
            Err(e) => {
                eprintln!("Failed to update {}: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Search package names
pub fn cmd_pkg_search(opts: &CatalogOptions, pattern: Option<&str>) -> Result<()> {
    let catalog = opts.open()?;
    for result in search(&catalog, pattern)? {
        let versions: Vec<String> = result.versions.iter().map(|v| v.to_string()).collect();
        println!("{}", result.name);
        println!("  Versions: {}", versions.join(", "));
        if let Some(description) = &result.description {
            println!("  {}", description);
        }
    }
    Ok(())
}

/// Resolve requirements and print the solution
pub fn cmd_pkg_solve(opts: &CatalogOptions, requirements: &[String]) -> Result<()> {
    let catalog = opts.open()?;
    let solution = resolve_strings(&catalog, requirements)?;
    for (_, pkg) in solution.iter() {
        println!("{}  ({})", pkg.record.key.package_id(), pkg.repo);
    }
    Ok(())
}

/// Prefetch explicit ids plus the resolved closure of `deps`
pub fn cmd_pkg_prefetch(opts: &CatalogOptions, ids: &[String], deps: &[String]) -> Result<()> {
    let catalog = opts.open()?;
    let mut wanted = parse_ids(ids)?;
    if !deps.is_empty() {
        let solution = resolve_strings(&catalog, deps)?;
        wanted.extend(solution.iter().map(|(_, pkg)| pkg.record.key.package_id()));
    }
    if wanted.is_empty() {
        info!("Nothing to prefetch");
        return Ok(());
    }

    let dirs = catalog.prefetch(&wanted)?;
    for (id, dir) in wanted.iter().zip(&dirs) {
        println!("{} -> {}", id, dir.display());
    }
    Ok(())
}

/// Expand packages into `out`
pub fn cmd_pkg_get(opts: &CatalogOptions, ids: &[String], out: &Path) -> Result<()> {
    let catalog: Catalog = opts.open()?;
    for id in parse_ids(ids)? {
        let dir = catalog.get(&id, out)?;
        println!("{} -> {}", id, dir.display());
    }
    Ok(())
}

fn parse_ids(ids: &[String]) -> Result<Vec<PackageId>> {
    Ok(ids
        .iter()
        .map(|s| PackageId::parse(s))
        .collect::<pkgindex::Result<Vec<_>>>()?)
}
