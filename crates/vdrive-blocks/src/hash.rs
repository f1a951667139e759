//! SHA-256 content hashing for blocks
//!
//! The server's wire contract addresses blocks by SHA-256; digests travel
//! armored (base64) in upload requests.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Hash a byte slice in memory. Fast for staged blocks.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Hash a file using the streaming interface (for blocks too large to read
/// fully).
pub fn sha256_file(path: &Path) -> Result<[u8; 32]> {
    let mut file = std::fs::File::open(path)
        .with_context(|| format!("opening file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = file.read(&mut buf).context("reading for hash")?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize().into())
}
