// src/cli/repo.rs
//! Repository management commands

use clap::Subcommand;
use pkgindex::{IfExists, IfMissing};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum RepoCommands {
    /// Create a new, empty repository
    Init {
        /// Repository directory
        dir: PathBuf,

        /// Name the repository declares to its clients
        #[arg(long)]
        name: String,

        /// What to do if a repository already exists in the directory
        #[arg(long, value_enum, default_value_t = IfExists::Fail)]
        if_exists: IfExists,
    },

    /// Import package directories or .tgz archives
    Import {
        /// Repository directory
        dir: PathBuf,

        /// Package sources, each a directory or archive with pkg.json at its root
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// What to do if a package with the same identity is already present
        #[arg(long, value_enum, default_value_t = IfExists::Fail)]
        if_exists: IfExists,

        /// Skip the repository-wide validation pass after importing
        #[arg(long)]
        no_validate: bool,
    },

    /// Check every package in a repository
    Validate {
        /// Repository directory
        dir: PathBuf,
    },

    /// List the packages in a repository
    Ls {
        /// Repository directory
        dir: PathBuf,
    },

    /// Remove packages from a repository
    Remove {
        /// Repository directory
        dir: PathBuf,

        /// Package ids (name@version~meta_version)
        #[arg(required = true)]
        ids: Vec<String>,

        /// What to do if a package is not in the repository
        #[arg(long, value_enum, default_value_t = IfMissing::Fail)]
        if_missing: IfMissing,
    },
}
