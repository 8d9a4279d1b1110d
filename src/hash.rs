// src/hash.rs

//! SHA-256 digests for package blob integrity
//!
//! Blobs are hashed while streaming so archives of any size never need to
//! be held in memory. Digests are lowercase hex strings as stored in the
//! repository index.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Buffer size for streaming reads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

/// Digest and byte count of hashed content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest256 {
    pub hex: String,
    pub size: u64,
}

/// Compute SHA-256 hash of bytes, returning hex string
pub fn sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hash everything a reader yields
pub fn sha256_reader<R: Read>(reader: &mut R) -> io::Result<Digest256> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];
    let mut size = 0u64;

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        size += n as u64;
    }

    Ok(Digest256 {
        hex: hex::encode(hasher.finalize()),
        size,
    })
}

/// Hash a file on disk
pub fn sha256_file(path: &Path) -> io::Result<Digest256> {
    let mut file = File::open(path)?;
    sha256_reader(&mut file)
}

/// Verify a file against an expected hex digest
///
/// `package` only labels the error.
pub fn verify_file_sha256(path: &Path, expected: &str, package: &str) -> Result<()> {
    let actual = sha256_file(path)?;
    if !actual.hex.eq_ignore_ascii_case(expected) {
        return Err(Error::ChecksumMismatch {
            package: package.to_string(),
            expected: expected.to_string(),
            actual: actual.hex,
        });
    }
    Ok(())
}
