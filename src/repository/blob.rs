// src/repository/blob.rs

//! Package blob archives (`pkg.tgz`)
//!
//! A blob is a gzip-compressed tar of the package tree with `pkg.json` at
//! the archive root. Entries are added in sorted order so the same tree
//! always produces the same member list.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tar::{Archive, Builder};
use tracing::debug;
use walkdir::WalkDir;

/// File name of a stored blob
pub const BLOB_FILE_NAME: &str = "pkg.tgz";

/// Archive a package tree into `out`
pub fn pack_tree<W: Write>(source_dir: &Path, out: W) -> io::Result<W> {
    let encoder = GzEncoder::new(out, Compression::default());
    let mut archive = Builder::new(encoder);

    for entry in WalkDir::new(source_dir).sort_by_file_name().min_depth(1) {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(io::Error::other)?;

        if entry.file_type().is_dir() {
            archive.append_dir(rel, entry.path())?;
        } else {
            let mut file = File::open(entry.path())?;
            archive.append_file(rel, &mut file)?;
        }
    }

    let encoder = archive.into_inner()?;
    let out = encoder.finish()?;
    debug!("Packed {}", source_dir.display());
    Ok(out)
}

/// Expand an archive into `dest`, creating it if needed
///
/// Members that would land outside `dest` are rejected by `tar`.
pub fn unpack_archive(archive_path: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(false);
    archive.unpack(dest)?;
    Ok(())
}

/// Does this path name a gzip tarball by extension?
pub fn is_archive_path(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    name.ends_with(".tgz") || name.ends_with(".tar.gz")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_tree(dir: &Path) {
        fs::write(dir.join("pkg.json"), "{}").unwrap();
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("src/my-file.cpp"), "int main() {}\n").unwrap();
    }

    #[test]
    fn test_pack_and_unpack() {
        let tmp = TempDir::new().unwrap();
        let tree = tmp.path().join("tree");
        fs::create_dir_all(&tree).unwrap();
        sample_tree(&tree);

        let blob = tmp.path().join(BLOB_FILE_NAME);
        pack_tree(&tree, File::create(&blob).unwrap()).unwrap();

        let out = tmp.path().join("out");
        unpack_archive(&blob, &out).unwrap();
        assert_eq!(fs::read_to_string(out.join("pkg.json")).unwrap(), "{}");
        assert_eq!(
            fs::read_to_string(out.join("src/my-file.cpp")).unwrap(),
            "int main() {}\n"
        );
    }

    #[test]
    fn test_garbage_archive() {
        let tmp = TempDir::new().unwrap();
        let bad = tmp.path().join("bad.tgz");
        fs::write(&bad, "definitely not gzip").unwrap();
        assert!(unpack_archive(&bad, &tmp.path().join("out")).is_err());
    }

    #[test]
    fn test_is_archive_path() {
        assert!(is_archive_path(Path::new("/x/foo-1.0.tar.gz")));
        assert!(is_archive_path(Path::new("foo.TGZ")));
        assert!(!is_archive_path(Path::new("foo.zip")));
    }
}
