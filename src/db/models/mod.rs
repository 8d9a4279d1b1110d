// src/db/models/mod.rs

//! Data models for index and catalog rows
//!
//! Each model maps one table and carries its own insert/find/delete helpers.

mod catalog_repo;
mod package;

pub use catalog_repo::CatalogRepo;
pub use package::{BlobRef, PackageId, PackageKey, PackageRecord};
