// src/lib.rs

//! pkgindex: package repositories and dependency resolution
//!
//! Producers publish versioned packages into a repository; consumers add
//! repositories to a local catalog, search them, and resolve requirement
//! strings into one consistent set of package versions.
//!
//! # Architecture
//!
//! - Repository: one SQLite index file plus a tree of package archives,
//!   mutated only under an exclusive lock by temp file and rename
//! - Sync snapshot: a gzip copy of the index that clients fetch and cache
//! - Catalog: the client's list of repositories and their cached snapshots
//! - Resolver: greedy-highest choice with backtracking over a
//!   [`resolver::PackageSource`]

pub mod catalog;
pub mod config;
pub mod db;
mod error;
pub mod hash;
pub mod manifest;
pub mod repository;
pub mod resolver;
pub mod search;
pub mod version;

pub use catalog::{Catalog, CatalogPackage, SyncMode};
pub use config::Config;
pub use error::{Error, Result};
pub use manifest::{ManifestError, PackageManifest};
pub use repository::{IfExists, IfMissing, RepositoryStore};
pub use resolver::{ResolvedSet, resolve, resolve_strings};
pub use search::{SearchResult, search};
pub use version::{DependencyRequirement, VersionRange};
