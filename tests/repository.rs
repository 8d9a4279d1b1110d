// tests/repository.rs

//! Repository store and import pipeline tests.

mod common;

use common::{TestRepo, manifest, write_package};
use pkgindex::repository::{PutOutcome, import_package, import_packages, validate_repository};
use pkgindex::{IfExists, IfMissing, RepositoryStore};
use rusqlite::Connection;
use serde_json::json;
use std::fs;
use std::thread::sleep;
use std::time::{Duration, SystemTime};

fn mtime(path: &std::path::Path) -> SystemTime {
    fs::metadata(path).unwrap().modified().unwrap()
}

#[test]
fn test_init_policies() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("repo");

    let store = RepositoryStore::init(&root, "test-repo", IfExists::Fail).unwrap();
    assert_eq!(store.name(), "test-repo");
    assert!(store.index_path().is_file());
    assert!(store.snapshot_path().is_file());

    let err = RepositoryStore::init(&root, "test-repo", IfExists::Fail).unwrap_err();
    assert_eq!(err.id(), "repo-already-initialized");

    let before = mtime(&store.index_path());
    sleep(Duration::from_millis(10));
    RepositoryStore::init(&root, "test-repo", IfExists::Ignore).unwrap();
    assert_eq!(mtime(&store.index_path()), before);

    sleep(Duration::from_millis(10));
    RepositoryStore::init(&root, "test-repo", IfExists::Replace).unwrap();
    assert!(mtime(&store.index_path()) > before);
}

#[test]
fn test_replace_drops_packages() {
    let repo = TestRepo::new("test-repo");
    repo.add(&manifest("test-pkg", "1.2.43", 1, &[]));
    assert_eq!(repo.store.list().unwrap().len(), 1);

    let store = RepositoryStore::init(repo.root(), "test-repo", IfExists::Replace).unwrap();
    assert!(store.list().unwrap().is_empty());
    assert!(!repo.root().join("pkg").exists());
}

#[test]
fn test_double_import() {
    let repo = TestRepo::new("test-repo");
    let src = write_package(
        &repo.tmp.path().join("src"),
        &manifest("test-pkg", "1.2.43", 1, &[]),
    );

    import_package(&repo.store, &src, IfExists::Fail).unwrap();
    let key = repo.store.list().unwrap()[0].key.clone();
    let blob = repo.store.blob_path(&key);

    let err = import_package(&repo.store, &src, IfExists::Fail).unwrap_err();
    assert_eq!(err.id(), "package-already-exists");
    assert!(err.to_string().contains("test-pkg@1.2.43~1"));

    let before = mtime(&blob);
    sleep(Duration::from_millis(10));
    let outcome = import_package(&repo.store, &src, IfExists::Ignore).unwrap();
    assert_eq!(outcome.outcome, PutOutcome::Skipped);
    assert_eq!(mtime(&blob), before);

    sleep(Duration::from_millis(10));
    let outcome = import_package(&repo.store, &src, IfExists::Replace).unwrap();
    assert_eq!(outcome.outcome, PutOutcome::Replaced);
    assert!(mtime(&blob) > before);
    assert_eq!(repo.store.list().unwrap().len(), 1);
}

#[test]
fn test_bulk_import_keeps_earlier_commits() {
    let repo = TestRepo::new("test-repo");
    let good = write_package(
        &repo.tmp.path().join("good"),
        &manifest("good-pkg", "1.0.0", 1, &[]),
    );
    let bad = write_package(
        &repo.tmp.path().join("bad"),
        &manifest("bad-pkg", "1.0.0", 0, &[]),
    );

    let err = import_packages(&repo.store, &[good, bad], IfExists::Fail).unwrap_err();
    assert_eq!(err.id(), "meta-version-invalid");

    let names: Vec<_> = repo
        .store
        .list()
        .unwrap()
        .into_iter()
        .map(|r| r.key.name)
        .collect();
    assert_eq!(names, vec!["good-pkg"]);
}

#[test]
fn test_dangling_uses_rejected() {
    let repo = TestRepo::new("test-repo");
    let src = write_package(
        &repo.tmp.path().join("src"),
        &json!({
            "schema_version": 1,
            "name": "test-pkg",
            "namespace": "test",
            "version": "1.0.0",
            "meta_version": 1,
            "libraries": [{
                "name": "main",
                "path": ".",
                "uses": [{"lib": "nonexistent", "for": "lib"}],
            }],
        }),
    );

    let err = import_package(&repo.store, &src, IfExists::Fail).unwrap_err();
    assert_eq!(err.id(), "dangling-library-reference");
    assert!(repo.store.list().unwrap().is_empty());
}

#[test]
fn test_remove_package() {
    let repo = TestRepo::new("test-repo");
    repo.add(&manifest("test-pkg", "1.2.43", 1, &[]));
    let key = repo.store.list().unwrap()[0].key.clone();

    assert!(repo.store.remove_package(&key, IfMissing::Fail).unwrap());
    assert!(!repo.store.blob_path(&key).exists());
    assert_eq!(
        repo.store.remove_package(&key, IfMissing::Fail).unwrap_err().id(),
        "package-not-found"
    );
    assert!(!repo.store.remove_package(&key, IfMissing::Ignore).unwrap());
}

#[test]
fn test_validate_clean_repository() {
    let repo = TestRepo::new("test-repo");
    repo.add(&manifest("test-pkg", "1.2.43", 1, &[]));
    repo.add(&manifest("other-pkg", "0.1.0", 2, &["test-pkg@1.2.0"]));

    let report = validate_repository(&repo.store).unwrap();
    assert!(report.is_ok());
    assert_eq!(report.into_result().unwrap(), 2);
}

#[test]
fn test_validate_reports_missing_blob() {
    let repo = TestRepo::new("test-repo");
    repo.add(&manifest("test-pkg", "1.2.43", 1, &[]));
    let key = repo.store.list().unwrap()[0].key.clone();
    fs::remove_file(repo.store.blob_path(&key)).unwrap();

    let err = validate_repository(&repo.store)
        .unwrap()
        .into_result()
        .unwrap_err();
    assert_eq!(err.id(), "repo-invalid");
}

#[test]
fn test_schema_too_new() {
    let repo = TestRepo::new("test-repo");
    {
        let conn = Connection::open(repo.store.index_path()).unwrap();
        conn.execute("UPDATE repo_meta SET version = 300", []).unwrap();
    }
    let err = RepositoryStore::open(repo.root()).unwrap_err();
    assert_eq!(err.id(), "repo-too-new");
}

#[test]
fn test_schema_not_a_number() {
    let repo = TestRepo::new("test-repo");
    {
        let conn = Connection::open(repo.store.index_path()).unwrap();
        conn.execute("UPDATE repo_meta SET version = 'eggs'", []).unwrap();
    }
    let err = RepositoryStore::open(repo.root()).unwrap_err();
    assert_eq!(err.id(), "repo-invalid");
}

#[test]
fn test_garbage_index() {
    let repo = TestRepo::new("test-repo");
    fs::write(repo.store.index_path(), "this is not a database").unwrap();
    let err = RepositoryStore::open(repo.root()).unwrap_err();
    assert_eq!(err.id(), "repo-invalid");
}

#[test]
fn test_open_missing_repository() {
    let tmp = tempfile::tempdir().unwrap();
    let err = RepositoryStore::open(tmp.path()).unwrap_err();
    assert_eq!(err.id(), "repo-invalid");
}

#[test]
fn test_concurrent_imports_all_commit() {
    let repo = TestRepo::new("test-repo");
    let sources: Vec<_> = (0..8)
        .map(|i| {
            write_package(
                &repo.tmp.path().join(format!("src-{i}")),
                &manifest(&format!("pkg-{i}"), "1.0.0", 1, &[]),
            )
        })
        .collect();

    std::thread::scope(|scope| {
        for src in &sources {
            let store = repo.store.clone();
            scope.spawn(move || import_package(&store, src, IfExists::Fail).unwrap());
        }
    });

    let records = repo.store.list().unwrap();
    assert_eq!(records.len(), sources.len());
    for record in &records {
        assert!(repo.store.blob_path(&record.key).is_file());
    }
    assert!(validate_repository(&repo.store).unwrap().is_ok());
}

#[test]
fn test_path_like_names_rejected_on_import() {
    let repo = TestRepo::new("test-repo");
    for (field, value) in [("name", ".."), ("namespace", ".."), ("namespace", ".git")] {
        let mut pkg = manifest("test-pkg", "1.0.0", 1, &[]);
        pkg[field] = json!(value);
        let src = write_package(&repo.tmp.path().join(format!("src-{field}-{value}")), &pkg);

        let err = import_package(&repo.store, &src, IfExists::Fail).unwrap_err();
        assert_eq!(err.id(), "manifest-shape-invalid", "{field} = {value}");
    }
    assert!(repo.store.list().unwrap().is_empty());
    assert!(!repo.root().join("pkg").exists());
    assert!(!repo.tmp.path().join("pkg").exists());
}

#[test]
fn test_path_like_repository_name_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let err = RepositoryStore::init(&tmp.path().join("repo"), "..", IfExists::Fail).unwrap_err();
    assert_eq!(err.id(), "repo-invalid");
}
