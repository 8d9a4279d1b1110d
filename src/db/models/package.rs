// src/db/models/package.rs

//! PackageRecord model - one imported package version in a repository index

use crate::error::{Error, Result};
use crate::manifest::PackageManifest;
use crate::version::{parse_version, validate_package_name};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use semver::Version;
use std::fmt;
use std::str::FromStr;

const RECORD_COLUMNS: &str = "package_id, namespace, name, version, meta_version, manifest,
     blob_path, blob_sha256, blob_size, imported_at";

/// Unique identity of a record within one repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageKey {
    pub namespace: String,
    pub name: String,
    pub version: Version,
    pub meta_version: i64,
}

impl PackageKey {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: Version,
        meta_version: i64,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            version,
            meta_version,
        }
    }

    pub fn from_manifest(manifest: &PackageManifest) -> Self {
        Self::new(
            manifest.namespace.clone(),
            manifest.name.clone(),
            manifest.version.clone(),
            manifest.meta_version,
        )
    }

    /// Blob location relative to the repository root
    pub fn blob_rel_path(&self) -> String {
        format!(
            "pkg/{}/{}/{}~{}/pkg.tgz",
            self.namespace, self.name, self.version, self.meta_version
        )
    }

    /// Client-facing `name@version~meta` identity
    pub fn package_id(&self) -> PackageId {
        PackageId {
            name: self.name.clone(),
            version: self.version.clone(),
            meta_version: Some(self.meta_version),
        }
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}~{}",
            self.namespace, self.name, self.version, self.meta_version
        )
    }
}

/// Package identity as typed by users: `name@version` or `name@version~meta`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageId {
    pub name: String,
    pub version: Version,
    /// `None` selects the highest available meta_version
    pub meta_version: Option<i64>,
}

impl PackageId {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidRequirement {
            input: input.to_string(),
            reason,
        };

        let (name, rest) = input
            .trim()
            .split_once('@')
            .ok_or_else(|| invalid("expected <name>@<version>[~<meta_version>]".to_string()))?;
        validate_package_name(name).map_err(invalid)?;

        let (version, meta_version) = match rest.split_once('~') {
            Some((version, meta)) => {
                let meta: i64 = meta
                    .parse()
                    .map_err(|_| invalid(format!("invalid meta_version '{meta}'")))?;
                (version, Some(meta))
            }
            None => (rest, None),
        };
        let version = parse_version(version).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            version,
            meta_version,
        })
    }

    /// Does this id select the given key?
    pub fn matches(&self, key: &PackageKey) -> bool {
        self.name == key.name
            && self.version == key.version
            && self.meta_version.is_none_or(|m| m == key.meta_version)
    }
}

impl FromStr for PackageId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)?;
        if let Some(meta) = self.meta_version {
            write!(f, "~{meta}")?;
        }
        Ok(())
    }
}

/// Location and digest of a record's archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    /// Relative to the repository root, `/`-separated
    pub path: String,
    pub sha256: String,
    pub size: i64,
}

/// A package version stored in a repository index
#[derive(Debug, Clone)]
pub struct PackageRecord {
    pub id: Option<i64>,
    pub key: PackageKey,
    pub manifest: PackageManifest,
    pub blob: BlobRef,
    pub imported_at: String,
}

impl PackageRecord {
    /// Create a new record keyed by the manifest's identity
    pub fn new(manifest: PackageManifest, blob: BlobRef) -> Self {
        Self {
            id: None,
            key: PackageKey::from_manifest(&manifest),
            manifest,
            blob,
            imported_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn version(&self) -> &Version {
        &self.key.version
    }

    /// Insert this record into the index
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO packages (namespace, name, version, meta_version, manifest,
             blob_path, blob_sha256, blob_size, imported_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                &self.key.namespace,
                &self.key.name,
                self.key.version.to_string(),
                self.key.meta_version,
                self.manifest.to_json()?,
                &self.blob.path,
                &self.blob.sha256,
                self.blob.size,
                &self.imported_at,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a record by its key
    pub fn find(conn: &Connection, key: &PackageKey) -> Result<Option<Self>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM packages
             WHERE namespace = ?1 AND name = ?2 AND version = ?3 AND meta_version = ?4"
        );
        let mut stmt = conn.prepare(&sql)?;
        let record = stmt
            .query_row(
                params![
                    &key.namespace,
                    &key.name,
                    key.version.to_string(),
                    key.meta_version
                ],
                Self::from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// All records of a package name, highest version first
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Vec<Self>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM packages WHERE name = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let mut records = stmt
            .query_map([name], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| b.key.cmp(&a.key));
        Ok(records)
    }

    /// All records, ordered by name then ascending version
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM packages");
        let mut stmt = conn.prepare(&sql)?;
        let mut records = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        sort_records(&mut records);
        Ok(records)
    }

    /// Like [`PackageRecord::list_all`], but rows that cannot be decoded
    /// are returned as descriptions instead of failing the whole listing
    pub fn list_decodable(conn: &Connection) -> Result<(Vec<Self>, Vec<String>)> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM packages");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut records = Vec::new();
        let mut undecodable = Vec::new();
        while let Some(row) = rows.next()? {
            match Self::from_row(row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    let rowid: Option<i64> = row.get(0).ok();
                    undecodable.push(format!("row {}: {e}", rowid.unwrap_or(-1)));
                }
            }
        }
        sort_records(&mut records);
        Ok((records, undecodable))
    }

    /// Delete the record with this key, returning whether a row was removed
    pub fn delete(conn: &Connection, key: &PackageKey) -> Result<bool> {
        let removed = conn.execute(
            "DELETE FROM packages
             WHERE namespace = ?1 AND name = ?2 AND version = ?3 AND meta_version = ?4",
            params![
                &key.namespace,
                &key.name,
                key.version.to_string(),
                key.meta_version
            ],
        )?;
        Ok(removed > 0)
    }

    /// Convert a database row to a PackageRecord
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let version: String = row.get(3)?;
        let version = Version::parse(&version)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
        let manifest: String = row.get(5)?;
        let manifest = PackageManifest::from_stored(&manifest)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
        let namespace: String = row.get(1)?;
        let name: String = row.get(2)?;
        for (idx, value) in [(1, &namespace), (2, &name)] {
            validate_package_name(value).map_err(|reason| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, reason.into())
            })?;
        }

        Ok(Self {
            id: Some(row.get(0)?),
            key: PackageKey {
                namespace,
                name,
                version,
                meta_version: row.get(4)?,
            },
            manifest,
            blob: BlobRef {
                path: row.get(6)?,
                sha256: row.get(7)?,
                size: row.get(8)?,
            },
            imported_at: row.get(9)?,
        })
    }
}

fn sort_records(records: &mut [PackageRecord]) {
    records.sort_by(|a, b| {
        (&a.key.name, &a.key.version, a.key.meta_version, &a.key.namespace).cmp(&(
            &b.key.name,
            &b.key.version,
            b.key.meta_version,
            &b.key.namespace,
        ))
    });
}
