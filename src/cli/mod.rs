// src/cli/mod.rs
//! CLI definitions for pkgindex
//!
//! This module contains the command-line interface definitions using clap.
//! The command implementations are in the `commands` module.
//!
//! Two contexts:
//! - `repo` - Producer side: create, fill and check a repository directory
//! - `pkg` - Consumer side: catalog repositories, search, resolve and fetch

use clap::{Parser, Subcommand};
use pkgindex::SyncMode;
use std::path::PathBuf;

mod package;
mod repo;

pub use package::{PkgCommands, PkgRepoCommands};
pub use repo::RepoCommands;

#[derive(Parser)]
#[command(name = "pkgindex")]
#[command(author = "pkgindex Contributors")]
#[command(version)]
#[command(about = "Package repositories, catalog and dependency resolution", long_about = None)]
pub struct Cli {
    /// Cache directory for the catalog, snapshots and fetched packages
    #[arg(long, global = true, env = "PKGINDEX_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Use the repository at this location (path or URL); repeatable
    #[arg(long = "use-repo", global = true, value_name = "LOCATION")]
    pub use_repos: Vec<String>,

    /// When to re-fetch snapshots of `--use-repo` repositories
    #[arg(long, global = true, value_enum)]
    pub repo_sync_mode: Option<SyncMode>,

    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Configuration file (default: <config dir>/pkgindex/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage a package repository
    #[command(subcommand)]
    Repo(RepoCommands),

    /// Find, resolve and fetch packages from cataloged repositories
    #[command(subcommand)]
    Pkg(PkgCommands),
}
