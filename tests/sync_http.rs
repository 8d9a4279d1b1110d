// tests/sync_http.rs

//! Snapshot sync and package fetch over HTTP.

mod common;

use common::{MY_FILE_CPP, TestRepo, catalog, manifest};
use pkgindex::db::models::PackageId;
use std::fs;

#[test]
fn test_http_snapshot_not_found() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/repo/repo.db.gz")
        .with_status(404)
        .create();

    let (_cache, catalog) = catalog();
    let err = catalog.add(&format!("{}/repo", server.url())).unwrap_err();
    assert_eq!(err.id(), "sync-not-found");
    assert!(catalog.list().unwrap().is_empty());
    mock.assert();
}

#[test]
fn test_http_snapshot_garbage() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/repo/repo.db.gz")
        .with_status(200)
        .with_body("lolhi")
        .create();

    let (_cache, catalog) = catalog();
    let err = catalog.add(&format!("{}/repo", server.url())).unwrap_err();
    assert_eq!(err.id(), "sync-snapshot-invalid");
    assert!(catalog.list().unwrap().is_empty());
}

#[test]
fn test_http_server_error() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/repo/repo.db.gz")
        .with_status(500)
        .create();

    let (_cache, catalog) = catalog();
    let err = catalog.add(&format!("{}/repo", server.url())).unwrap_err();
    assert_eq!(err.id(), "download-error");
}

#[test]
fn test_http_add_and_prefetch() {
    let repo = TestRepo::new("remote-repo");
    repo.add(&manifest("test-pkg", "1.2.43", 1, &[]));
    let key = repo.store.list().unwrap()[0].key.clone();

    let mut server = mockito::Server::new();
    server
        .mock("GET", "/repo/repo.db.gz")
        .with_status(200)
        .with_body(fs::read(repo.store.snapshot_path()).unwrap())
        .create();
    let blob = server
        .mock("GET", format!("/repo/{}", key.blob_rel_path()).as_str())
        .with_status(200)
        .with_body(fs::read(repo.store.blob_path(&key)).unwrap())
        .expect(1)
        .create();

    let (_cache, catalog) = catalog();
    let added = catalog.add(&format!("{}/repo", server.url())).unwrap();
    assert_eq!(added.name, "remote-repo");

    let id = PackageId::parse("test-pkg@1.2.43~1").unwrap();
    let dirs = catalog.prefetch(std::slice::from_ref(&id)).unwrap();
    assert_eq!(
        fs::read_to_string(dirs[0].join("src/my-file.cpp")).unwrap(),
        MY_FILE_CPP
    );

    // Cached: no second download
    catalog.prefetch(&[id]).unwrap();
    blob.assert();
}
