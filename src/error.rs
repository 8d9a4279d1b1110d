// src/error.rs

//! Error types for pkgindex
//!
//! Every failure that can reach a user carries a stable, machine-readable
//! identifier (see [`Error::id`]). The CLI prints it as `error[<id>]` so
//! scripts and tests can match on the kind of failure without parsing the
//! human-readable message.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Repository state
    #[error("A repository already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error(
        "Repository at {path} has schema version {found}, but only version {supported} is supported"
    )]
    RepositoryTooNew {
        path: PathBuf,
        found: i64,
        supported: i64,
    },

    #[error("Invalid repository index at {path}: {reason}")]
    RepositoryInvalid { path: PathBuf, reason: String },

    // Import
    #[error("Invalid manifest encoding in {source_path}: {reason}")]
    ManifestEncoding { source_path: String, reason: String },

    #[error("Invalid manifest shape in {source_path}: {reason}")]
    ManifestShape { source_path: String, reason: String },

    #[error("Invalid meta_version in {source_path}: {reason}")]
    InvalidMetaVersion { source_path: String, reason: String },

    #[error(
        "Library '{library}' of {package} uses '{target}', which the package does not declare"
    )]
    DanglingLibraryReference {
        package: String,
        library: String,
        target: String,
    },

    #[error("Package source not found: {0}")]
    SourceNotFound(String),

    #[error("Failed to read package source {source_path}: {reason}")]
    SourceStorage { source_path: String, reason: String },

    #[error("Package {0} already exists in the repository")]
    PackageAlreadyExists(String),

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    // Sync/transport
    #[error("Sync transfer not found: {0}")]
    SyncNotFound(String),

    #[error("Invalid sync snapshot from {location}: {reason}")]
    SnapshotInvalid { location: String, reason: String },

    #[error("Download failed: {0}")]
    DownloadError(String),

    #[error("Checksum mismatch for {package}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        package: String,
        expected: String,
        actual: String,
    },

    // Catalog
    #[error("No such repository: {0}")]
    NoSuchRepository(String),

    // Resolve
    #[error("No dependency solution: {0}")]
    NoSolution(String),

    #[error("Invalid requirement '{input}': {reason}")]
    InvalidRequirement { input: String, reason: String },

    // Search
    #[error("No packages match '{0}'")]
    SearchNoResult(String),

    // Ambient
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable identifier for this kind of failure
    pub fn id(&self) -> &'static str {
        match self {
            Error::AlreadyInitialized(_) => "repo-already-initialized",
            Error::RepositoryTooNew { .. } => "repo-too-new",
            Error::RepositoryInvalid { .. } => "repo-invalid",
            Error::ManifestEncoding { .. } => "manifest-parse-error",
            Error::ManifestShape { .. } => "manifest-shape-invalid",
            Error::InvalidMetaVersion { .. } => "meta-version-invalid",
            Error::DanglingLibraryReference { .. } => "dangling-library-reference",
            Error::SourceNotFound(_) => "source-not-found",
            Error::SourceStorage { .. } => "source-storage-error",
            Error::PackageAlreadyExists(_) => "package-already-exists",
            Error::PackageNotFound(_) => "package-not-found",
            Error::SyncNotFound(_) => "sync-not-found",
            Error::SnapshotInvalid { .. } => "sync-snapshot-invalid",
            Error::DownloadError(_) => "download-error",
            Error::ChecksumMismatch { .. } => "blob-checksum-mismatch",
            Error::NoSuchRepository(_) => "no-such-repository",
            Error::NoSolution(_) => "no-solution",
            Error::InvalidRequirement { .. } => "invalid-requirement",
            Error::SearchNoResult(_) => "search-no-result",
            Error::Config(_) => "config-error",
            Error::Io(_) => "io-error",
            Error::Database(_) => "database-error",
            Error::Json(_) => "json-error",
        }
    }
}
