// src/db/schema.rs

//! Database schema definitions for the repository index and the client catalog
//!
//! The repository index (`repo.db`) is a distributable file: its layout
//! version lives in `repo_meta` and is checked on every open, and a newer
//! version is refused rather than migrated. The catalog is private client
//! state and is migrated forward in place.

use crate::error::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// Repository index layout version understood by this implementation
pub const INDEX_SCHEMA_VERSION: i64 = 1;

/// Catalog schema version
pub const CATALOG_SCHEMA_VERSION: i32 = 1;

/// Create the tables of an empty repository index
///
/// `repo_meta.version` is declared without a type so that a corrupted or
/// foreign value is preserved as-is and can be reported on open.
pub fn create_index(conn: &Connection, repo_name: &str) -> Result<()> {
    debug!("Creating repository index schema version {}", INDEX_SCHEMA_VERSION);

    conn.execute_batch(
        "
        CREATE TABLE repo_meta (
            version
        );

        CREATE TABLE repo_self (
            rowid INTEGER PRIMARY KEY CHECK (rowid = 1),
            name TEXT NOT NULL
        );

        -- One row per (namespace, name, version, meta_version)
        CREATE TABLE packages (
            package_id INTEGER PRIMARY KEY AUTOINCREMENT,
            namespace TEXT NOT NULL,
            name TEXT NOT NULL,
            version TEXT NOT NULL,
            meta_version INTEGER NOT NULL,
            manifest TEXT NOT NULL,
            blob_path TEXT NOT NULL,
            blob_sha256 TEXT NOT NULL,
            blob_size INTEGER NOT NULL,
            imported_at TEXT NOT NULL,
            UNIQUE(namespace, name, version, meta_version)
        );

        CREATE INDEX idx_packages_name ON packages(name);
        ",
    )?;

    conn.execute(
        "INSERT INTO repo_meta (version) VALUES (?1)",
        [INDEX_SCHEMA_VERSION],
    )?;
    conn.execute(
        "INSERT INTO repo_self (rowid, name) VALUES (1, ?1)",
        [repo_name],
    )?;
    Ok(())
}

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get the current catalog schema version
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Apply all pending catalog migrations
pub fn migrate_catalog(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version >= CATALOG_SCHEMA_VERSION {
        debug!("Catalog schema is up to date (version {})", current_version);
        return Ok(());
    }

    for version in (current_version + 1)..=CATALOG_SCHEMA_VERSION {
        info!("Applying catalog migration to version {}", version);
        if version == 1 {
            catalog_v1(conn)?;
        }
        set_schema_version(conn, version)?;
    }
    Ok(())
}

/// Initial catalog schema
///
/// - catalog_repos: name -> location, in insertion order
fn catalog_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE catalog_repos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            location TEXT NOT NULL,
            added_at TEXT NOT NULL,
            last_sync TEXT
        );
        ",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_create_index_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_index(&conn, "main").unwrap();

        let tables = table_names(&conn);
        assert!(tables.contains(&"repo_meta".to_string()));
        assert!(tables.contains(&"repo_self".to_string()));
        assert!(tables.contains(&"packages".to_string()));

        let name: String = conn
            .query_row("SELECT name FROM repo_self", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "main");
    }

    #[test]
    fn test_package_key_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        create_index(&conn, "main").unwrap();

        let insert = "INSERT INTO packages (namespace, name, version, meta_version, manifest,
                      blob_path, blob_sha256, blob_size, imported_at)
                      VALUES ('ns', 'foo', '1.0.0', ?1, '{}', 'p', 'h', 0, 'now')";
        conn.execute(insert, [1]).unwrap();
        conn.execute(insert, [2]).unwrap();
        assert!(conn.execute(insert, [1]).is_err());
    }

    #[test]
    fn test_catalog_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate_catalog(&conn).unwrap();
        migrate_catalog(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CATALOG_SCHEMA_VERSION);
        assert!(table_names(&conn).contains(&"catalog_repos".to_string()));
    }
}
