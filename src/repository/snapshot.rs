// src/repository/snapshot.rs

//! Sync snapshots
//!
//! A snapshot is the repository index compressed with gzip and published
//! next to it as `repo.db.gz`. It is self-contained: a client that has
//! only the snapshot can list, search and resolve every package in the
//! repository.

use crate::db::{self, IndexInfo};
use crate::error::{Error, Result};
use crate::version::validate_package_name;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// File name of the snapshot inside a repository root
pub const SNAPSHOT_FILE_NAME: &str = "repo.db.gz";

/// File name of a cached, decompressed snapshot
pub const CACHED_INDEX_FILE_NAME: &str = "repo.db";

/// Compress an index into a temp file created in `dir`
///
/// The caller renames the result into place as part of its commit.
pub fn compress_index(index: &Path, dir: &Path) -> Result<NamedTempFile> {
    let tmp = tempfile::Builder::new()
        .prefix(".repo.db.gz.")
        .tempfile_in(dir)?;

    let mut input = File::open(index)?;
    let mut encoder = GzEncoder::new(tmp.as_file(), Compression::default());
    io::copy(&mut input, &mut encoder)?;
    let file = encoder.finish()?;
    file.sync_all()?;

    debug!("Compressed snapshot of {}", index.display());
    Ok(tmp)
}

/// Undo [`compress_index`]
pub fn decompress_snapshot(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Validate downloaded snapshot bytes and cache them under
/// `<repos_dir>/<name>/repo.db`, where `name` is the repository's own
/// declared name.
///
/// Nothing under `repos_dir` changes unless the snapshot is valid and, when
/// `expected` is given, declares that name.
pub fn install_snapshot(
    data: &[u8],
    location: &str,
    repos_dir: &Path,
    expected: Option<&str>,
) -> Result<IndexInfo> {
    let snapshot_invalid = |reason: String| Error::SnapshotInvalid {
        location: location.to_string(),
        reason,
    };

    let index = decompress_snapshot(data)
        .map_err(|e| snapshot_invalid(format!("not a gzip stream: {e}")))?;

    fs::create_dir_all(repos_dir)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".repo.db.")
        .tempfile_in(repos_dir)?;
    tmp.write_all(&index)?;
    tmp.as_file().sync_all()?;

    let info = match db::open_index_read_only(tmp.path()) {
        Ok((_conn, info)) => info,
        Err(e @ Error::RepositoryTooNew { .. }) => return Err(e),
        Err(e) => return Err(snapshot_invalid(e.to_string())),
    };
    validate_package_name(&info.name)
        .map_err(|reason| snapshot_invalid(format!("bad repository name: {reason}")))?;
    if let Some(expected) = expected
        && info.name != expected
    {
        return Err(snapshot_invalid(format!(
            "repository now calls itself '{}', expected '{}'",
            info.name, expected
        )));
    }

    let dest_dir = repos_dir.join(&info.name);
    fs::create_dir_all(&dest_dir)?;
    tmp.persist(dest_dir.join(CACHED_INDEX_FILE_NAME))
        .map_err(|e| Error::Io(e.error))?;

    info!("Cached snapshot of '{}' from {}", info.name, location);
    Ok(info)
}
