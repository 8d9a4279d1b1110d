// src/cli/package.rs
//! Package consumer commands

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum PkgCommands {
    /// Search cataloged repositories by package name
    Search {
        /// Glob pattern (*, ?, [...]); matches everything if omitted
        pattern: Option<String>,
    },

    /// Resolve requirements into one version per package
    Solve {
        /// Requirements such as `foo@1.2.3` or `bar^2.0.0 using core`
        #[arg(required = true)]
        requirements: Vec<String>,
    },

    /// Download packages into the local package cache
    Prefetch {
        /// Package ids (name@version[~meta_version])
        ids: Vec<String>,

        /// Resolve requirements and prefetch the whole solution as well
        #[arg(long = "dep", value_name = "REQUIREMENT")]
        deps: Vec<String>,
    },

    /// Expand packages into a directory
    Get {
        /// Package ids (name@version[~meta_version])
        #[arg(required = true)]
        ids: Vec<String>,

        /// Destination directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Manage the repository catalog
    #[command(subcommand)]
    Repo(PkgRepoCommands),
}

#[derive(Subcommand)]
pub enum PkgRepoCommands {
    /// Add a repository by location (path, file:// or http(s):// URL)
    Add {
        location: String,
    },

    /// Remove repositories by name
    Remove {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List cataloged repositories
    Ls,

    /// Re-fetch every repository's snapshot
    Update,
}
