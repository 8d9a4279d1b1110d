// src/repository/mod.rs

//! Package repositories: storage, import and distribution
//!
//! This module provides functionality for:
//! - Creating and opening repository roots ([`RepositoryStore`])
//! - Importing packages from directories or archives
//! - Repository-wide validation
//! - Producing and installing sync snapshots
//! - Fetching snapshots and blobs from local or HTTP(S) locations

pub mod blob;
mod client;
mod import;
mod lock;
pub mod snapshot;
mod store;
mod validate;

pub use client::{Location, RepositoryClient};
pub use import::{ImportOutcome, StagedPackage, import_package, import_packages};
pub use lock::RepoLock;
pub use snapshot::{SNAPSHOT_FILE_NAME, install_snapshot};
pub use store::{
    INDEX_FILE_NAME, IfExists, IfMissing, LOCK_FILE_NAME, PKG_DIR_NAME, PutOutcome,
    RepositoryStore,
};
pub use validate::{ValidationReport, validate_repository};
