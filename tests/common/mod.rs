// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use pkgindex::{Catalog, IfExists, RepositoryStore};
use pkgindex::repository::import_package;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Contents of `src/my-file.cpp` in every generated package
pub const MY_FILE_CPP: &str = "#include <iostream>\n\nint my_function() { return 42; }\n";

/// Manifest for a single-library package
pub fn manifest(name: &str, version: &str, meta: i64, depends: &[&str]) -> Value {
    json!({
        "schema_version": 1,
        "name": name,
        "namespace": "test",
        "version": version,
        "meta_version": meta,
        "libraries": [{"name": name, "path": ".", "depends": depends}],
    })
}

/// Write a package directory with `pkg.json` and `src/my-file.cpp`
pub fn write_package(dir: &Path, manifest: &Value) -> PathBuf {
    fs::create_dir_all(dir.join("src")).unwrap();
    fs::write(dir.join("pkg.json"), manifest.to_string()).unwrap();
    fs::write(dir.join("src/my-file.cpp"), MY_FILE_CPP).unwrap();
    dir.to_path_buf()
}

/// A scratch area holding a repository root and package sources
pub struct TestRepo {
    pub tmp: TempDir,
    pub store: RepositoryStore,
}

impl TestRepo {
    pub fn new(name: &str) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let store = RepositoryStore::init(&tmp.path().join("repo"), name, IfExists::Fail).unwrap();
        Self { tmp, store }
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    /// Write a package source and import it
    pub fn add(&self, manifest: &Value) {
        let dir_name = format!(
            "src-{}-{}-{}",
            manifest["name"].as_str().unwrap(),
            manifest["version"].as_str().unwrap(),
            manifest["meta_version"]
        );
        let dir = write_package(&self.tmp.path().join(dir_name), manifest);
        import_package(&self.store, &dir, IfExists::Fail).unwrap();
    }
}

/// A fresh catalog in its own cache directory
pub fn catalog() -> (TempDir, Catalog) {
    let cache = tempfile::tempdir().unwrap();
    let catalog = Catalog::open(cache.path()).unwrap();
    (cache, catalog)
}
