// src/db/mod.rs

//! SQLite storage for repository indexes and the client catalog

pub mod models;
pub mod schema;

use crate::error::{Error, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::debug;

pub use schema::INDEX_SCHEMA_VERSION;

/// Identity read from a validated repository index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    pub version: i64,
}

/// Open an existing repository index for writing and validate it
pub fn open_index(path: &Path) -> Result<(Connection, IndexInfo)> {
    open_index_with(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
}

/// Open an existing repository index read-only and validate it
pub fn open_index_read_only(path: &Path) -> Result<(Connection, IndexInfo)> {
    open_index_with(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
}

fn open_index_with(path: &Path, flags: OpenFlags) -> Result<(Connection, IndexInfo)> {
    if !path.is_file() {
        return Err(Error::RepositoryInvalid {
            path: path.to_path_buf(),
            reason: "index file does not exist".to_string(),
        });
    }

    let conn = Connection::open_with_flags(path, flags | OpenFlags::SQLITE_OPEN_NO_MUTEX)
        .map_err(|e| invalid(path, e))?;
    let info = check_index(&conn, path)?;
    debug!("Opened index {} (repository '{}')", path.display(), info.name);
    Ok((conn, info))
}

/// Read and validate the layout version and repository identity
pub fn check_index(conn: &Connection, path: &Path) -> Result<IndexInfo> {
    let raw: Value = conn
        .query_row("SELECT version FROM repo_meta LIMIT 1", [], |row| row.get(0))
        .map_err(|e| invalid(path, e))?;

    let version = match raw {
        Value::Integer(n) if n > INDEX_SCHEMA_VERSION => {
            return Err(Error::RepositoryTooNew {
                path: path.to_path_buf(),
                found: n,
                supported: INDEX_SCHEMA_VERSION,
            });
        }
        Value::Integer(n) if n >= 1 => n,
        other => {
            return Err(Error::RepositoryInvalid {
                path: path.to_path_buf(),
                reason: format!("invalid index version {other:?}"),
            });
        }
    };

    let name: String = conn
        .query_row("SELECT name FROM repo_self WHERE rowid = 1", [], |row| {
            row.get(0)
        })
        .map_err(|e| invalid(path, e))?;

    Ok(IndexInfo { name, version })
}

/// Open (creating if needed) the client catalog database
pub fn open_catalog(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::migrate_catalog(&conn)?;
    Ok(conn)
}

fn invalid(path: &Path, err: rusqlite::Error) -> Error {
    Error::RepositoryInvalid {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
