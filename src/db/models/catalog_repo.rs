// src/db/models/catalog_repo.rs

//! CatalogRepo model - a repository registered in the client catalog

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

/// A repository known to the client, keyed by its self-declared name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRepo {
    pub id: Option<i64>,
    pub name: String,
    /// Local path or URL the snapshot is fetched from
    pub location: String,
    pub added_at: String,
    pub last_sync: Option<String>,
}

impl CatalogRepo {
    pub fn new(name: String, location: String) -> Self {
        Self {
            id: None,
            name,
            location,
            added_at: chrono::Utc::now().to_rfc3339(),
            last_sync: None,
        }
    }

    /// Insert, or refresh the location of an existing entry with the same name.
    ///
    /// A refreshed entry keeps its original position in the catalog order.
    pub fn upsert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO catalog_repos (name, location, added_at, last_sync)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET
                location = excluded.location,
                last_sync = excluded.last_sync",
            params![&self.name, &self.location, &self.added_at, &self.last_sync],
        )?;

        let id = conn.query_row(
            "SELECT id FROM catalog_repos WHERE name = ?1",
            [&self.name],
            |row| row.get(0),
        )?;
        self.id = Some(id);
        Ok(id)
    }

    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, location, added_at, last_sync
             FROM catalog_repos WHERE name = ?1",
        )?;
        let repo = stmt.query_row([name], Self::from_row).optional()?;
        Ok(repo)
    }

    /// Find the entry registered for a location, if any
    pub fn find_by_location(conn: &Connection, location: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, location, added_at, last_sync
             FROM catalog_repos WHERE location = ?1 ORDER BY id LIMIT 1",
        )?;
        let repo = stmt.query_row([location], Self::from_row).optional()?;
        Ok(repo)
    }

    /// All entries in insertion order
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, location, added_at, last_sync
             FROM catalog_repos ORDER BY id",
        )?;
        let repos = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(repos)
    }

    pub fn set_last_sync(conn: &Connection, name: &str, when: &str) -> Result<()> {
        conn.execute(
            "UPDATE catalog_repos SET last_sync = ?1 WHERE name = ?2",
            params![when, name],
        )?;
        Ok(())
    }

    /// Delete by name, returning whether an entry existed
    pub fn delete(conn: &Connection, name: &str) -> Result<bool> {
        let removed = conn.execute("DELETE FROM catalog_repos WHERE name = ?1", [name])?;
        Ok(removed > 0)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            location: row.get(2)?,
            added_at: row.get(3)?,
            last_sync: row.get(4)?,
        })
    }
}
