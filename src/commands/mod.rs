// src/commands/mod.rs
//! Command handlers for the pkgindex CLI

mod package;
mod repo;

pub use package::{
    cmd_pkg_get, cmd_pkg_prefetch, cmd_pkg_search, cmd_pkg_solve, cmd_repo_add, cmd_repo_list,
    cmd_repo_remove, cmd_repo_update,
};
pub use repo::{
    cmd_repo_import, cmd_repo_init, cmd_repo_ls, cmd_repo_remove_packages, cmd_repo_validate,
};

use anyhow::Result;
use pkgindex::{Catalog, Config, SyncMode};
use std::path::PathBuf;
use tracing::debug;

/// Settings shared by every `pkg` command
pub struct CatalogOptions {
    pub config: Config,
    pub cache_dir: Option<PathBuf>,
    pub use_repos: Vec<String>,
    pub repo_sync_mode: Option<SyncMode>,
}

impl CatalogOptions {
    /// Open the catalog and make sure every `--use-repo` location is in it
    ///
    /// Without `--use-repo`, the configured default repositories are used.
    pub fn open(&self) -> Result<Catalog> {
        let cache_dir = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => self.config.cache_dir()?,
        };
        let catalog = Catalog::open_with_client(&cache_dir, self.config.client()?)?;

        let mode = self.repo_sync_mode.unwrap_or(self.config.repo_sync_mode);
        let locations = if self.use_repos.is_empty() {
            &self.config.use_default_repos
        } else {
            &self.use_repos
        };
        for location in locations {
            let repo = catalog.ensure(location, mode)?;
            debug!("Using repository '{}' ({})", repo.name, repo.location);
        }
        Ok(catalog)
    }
}
