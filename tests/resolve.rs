// tests/resolve.rs

//! Dependency resolution against cataloged repositories.

mod common;

use common::{TestRepo, catalog, manifest};
use pkgindex::resolve_strings;
use rusqlite::Connection;
use serde_json::json;

fn solution(set: &pkgindex::ResolvedSet) -> Vec<String> {
    set.iter()
        .map(|(_, pkg)| format!("{}:{}", pkg.repo, pkg.record.key.package_id()))
        .collect()
}

#[test]
fn test_resolve_across_repositories() {
    let libs = TestRepo::new("libs");
    libs.add(&manifest("zlib", "1.2.11", 1, &[]));
    libs.add(&manifest("zlib", "1.3.0", 1, &[]));
    libs.add(&manifest("zlib", "2.0.0", 1, &[]));

    let apps = TestRepo::new("apps");
    apps.add(&manifest("app", "0.4.0", 1, &["zlib@1.2.0"]));
    apps.add(&manifest("app", "0.4.0", 2, &["zlib@1.2.0"]));

    let (_cache, catalog) = catalog();
    catalog.add(libs.root().to_str().unwrap()).unwrap();
    catalog.add(apps.root().to_str().unwrap()).unwrap();

    let set = resolve_strings(&catalog, &["app@0.4.0"]).unwrap();
    assert_eq!(
        solution(&set),
        vec!["apps:app@0.4.0~2", "libs:zlib@1.3.0~1"]
    );
}

#[test]
fn test_first_repository_wins_duplicates() {
    let first = TestRepo::new("first");
    first.add(&manifest("zlib", "1.3.0", 1, &[]));
    let second = TestRepo::new("second");
    second.add(&manifest("zlib", "1.3.0", 1, &[]));

    let (_cache, catalog) = catalog();
    catalog.add(first.root().to_str().unwrap()).unwrap();
    catalog.add(second.root().to_str().unwrap()).unwrap();

    let set = resolve_strings(&catalog, &["zlib@1.0.0"]).unwrap();
    assert_eq!(solution(&set), vec!["first:zlib@1.3.0~1"]);
}

#[test]
fn test_hostile_meta_version_is_excluded() {
    let repo = TestRepo::new("evil");
    repo.add(&manifest("bar", "1.2.3", 1, &[]));
    {
        let conn = Connection::open(repo.store.index_path()).unwrap();
        conn.execute("UPDATE packages SET meta_version = 0", []).unwrap();
    }
    repo.store.regenerate_snapshot().unwrap();

    let (_cache, catalog) = catalog();
    catalog.add(repo.root().to_str().unwrap()).unwrap();
    assert_eq!(catalog.packages().unwrap().len(), 1);

    let err = resolve_strings(&catalog, &["bar@1.2.3"]).unwrap_err();
    assert_eq!(err.id(), "no-solution");
    assert!(err.to_string().contains("bar"));
}

#[test]
fn test_unknown_package() {
    let (_cache, catalog) = catalog();
    let err = resolve_strings(&catalog, &["nothing@1.0.0"]).unwrap_err();
    assert_eq!(err.id(), "no-solution");
}

#[test]
fn test_using_selects_library_dependencies() {
    let repo = TestRepo::new("test-repo");
    repo.add(&json!({
        "schema_version": 1,
        "name": "multi",
        "namespace": "test",
        "version": "1.0.0",
        "meta_version": 1,
        "libraries": [
            {"name": "multi", "path": "."},
            {"name": "net", "path": "net", "depends": ["socket@3.0.0"]},
        ],
    }));
    repo.add(&manifest("socket", "3.1.0", 1, &[]));

    let (_cache, catalog) = catalog();
    catalog.add(repo.root().to_str().unwrap()).unwrap();

    let set = resolve_strings(&catalog, &["multi@1.0.0"]).unwrap();
    assert_eq!(solution(&set), vec!["test-repo:multi@1.0.0~1"]);

    let set = resolve_strings(&catalog, &["multi@1.0.0 using net"]).unwrap();
    assert_eq!(
        solution(&set),
        vec!["test-repo:multi@1.0.0~1", "test-repo:socket@3.1.0~1"]
    );
}

#[test]
fn test_manifest_meta_version_is_checked_too() {
    let repo = TestRepo::new("evil");
    repo.add(&manifest("bar", "1.2.3", 1, &[]));
    {
        let conn = Connection::open(repo.store.index_path()).unwrap();
        conn.execute(
            "UPDATE packages SET manifest = json_set(manifest, '$.meta_version', 0)",
            [],
        )
        .unwrap();
    }
    repo.store.regenerate_snapshot().unwrap();

    let (_cache, catalog) = catalog();
    catalog.add(repo.root().to_str().unwrap()).unwrap();
    let packages = catalog.packages().unwrap();
    assert_eq!(packages.len(), 1);
    assert_eq!(packages[0].record.key.meta_version, 1);

    let err = resolve_strings(&catalog, &["bar@1.2.3"]).unwrap_err();
    assert_eq!(err.id(), "no-solution");
}

#[test]
fn test_unreadable_record_does_not_poison_catalog() {
    let good = TestRepo::new("good");
    good.add(&manifest("zlib", "1.3.0", 1, &[]));
    let bad = TestRepo::new("bad");
    bad.add(&manifest("bar", "1.2.3", 1, &[]));
    {
        let conn = Connection::open(bad.store.index_path()).unwrap();
        conn.execute("UPDATE packages SET manifest = '{\"meta_version\":0}'", [])
            .unwrap();
    }
    bad.store.regenerate_snapshot().unwrap();

    let (_cache, catalog) = catalog();
    catalog.add(bad.root().to_str().unwrap()).unwrap();
    catalog.add(good.root().to_str().unwrap()).unwrap();
    assert_eq!(catalog.packages().unwrap().len(), 1);

    let set = resolve_strings(&catalog, &["zlib@1.0.0"]).unwrap();
    assert_eq!(solution(&set), vec!["good:zlib@1.3.0~1"]);

    let err = resolve_strings(&catalog, &["bar@1.2.3"]).unwrap_err();
    assert_eq!(err.id(), "no-solution");
}

#[test]
fn test_largest_major_version_resolves() {
    let repo = TestRepo::new("huge");
    repo.add(&manifest("bar", "18446744073709551615.0.0", 1, &[]));

    let (_cache, catalog) = catalog();
    catalog.add(repo.root().to_str().unwrap()).unwrap();

    let set = resolve_strings(&catalog, &["bar@18446744073709551615.0.0"]).unwrap();
    assert_eq!(solution(&set), vec!["huge:bar@18446744073709551615.0.0~1"]);
}
